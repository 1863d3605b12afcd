//! Block sequencing: delays, early responses, scoring and recording.

use pretty_assertions::assert_eq;
use streak_core::{
    BlockPhase, ElementId, Mode, PartnerLatency, ScoreBoard, Shape, TrialOutcome, TrialSpec,
};
use streak_experiment::{
    BlockSequencer, BlockSpec, DelayPolicy, Driver, ExperimentConfig, FeedbackPolicy,
    JsonLinesRecorder, MemoryRecorder, MemoryRenderer, NullRenderer, ScriptedInput,
    SessionContext, run_experiment,
};
use streak_timing::VirtualClock;

fn sure_win() -> TrialSpec {
    TrialSpec::ww(Shape::Circle, Mode::Group)
        .with_partner_latency(PartnerLatency::Fixed { ms: 300 })
}

fn sure_loss() -> TrialSpec {
    TrialSpec::ll(Shape::Circle, Mode::Group)
}

fn quick_delay() -> DelayPolicy {
    DelayPolicy {
        intervals_ms: vec![500],
        early_warning_ms: 2500,
        early_warning_gap_ms: 1000,
        max_early_retries: None,
    }
}

#[test]
fn records_carry_scores_and_outcomes() {
    let spec = BlockSpec::new("R1", vec![sure_win(), sure_loss()], 2).with_delay(quick_delay());
    let mut block = BlockSequencer::new(spec).unwrap();
    let input = ScriptedInput::new().on_stimulus([Some(200), None, Some(200), Some(100)]);
    let mut driver = Driver::new(VirtualClock::new(), input);
    let mut ctx = SessionContext::new(Some(3));
    let mut recorder = MemoryRecorder::new();

    let summary = block
        .run(&mut ctx, &mut driver, &mut NullRenderer, &mut recorder)
        .unwrap();

    let outcomes: Vec<TrialOutcome> = recorder.records.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![TrialOutcome::WW, TrialOutcome::LL, TrialOutcome::WW, TrialOutcome::WL]
    );
    assert_eq!(summary.completed, 4);
    assert_eq!(summary.outcomes.ww, 2);
    assert_eq!(summary.outcomes.total(), summary.completed);
    assert_eq!(
        summary.totals,
        ScoreBoard {
            participant: 30,
            partner: 20
        }
    );
    let totals: Vec<u32> = recorder.records.iter().map(|r| r.totals.participant).collect();
    assert_eq!(totals, vec![10, 10, 20, 30]);
    let indices: Vec<usize> = recorder.records.iter().map(|r| r.trial_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(driver.pending_timers(), 0);
}

#[test]
fn trial_timing_follows_delay_and_feedback() {
    let spec = BlockSpec::new("R1", vec![sure_win()], 2)
        .with_delay(quick_delay())
        .with_feedback_timing(1000, 2000);
    let mut block = BlockSequencer::new(spec).unwrap();
    let input = ScriptedInput::new().on_stimulus([Some(200), Some(200)]);
    let mut driver = Driver::new(VirtualClock::new(), input);
    let mut ctx = SessionContext::new(Some(3));
    let mut recorder = MemoryRecorder::new();

    block
        .run(&mut ctx, &mut driver, &mut NullRenderer, &mut recorder)
        .unwrap();

    let starts: Vec<u64> = recorder.records.iter().map(|r| r.timestamps.started_ms).collect();
    // delay 500, trial 200, outcome 1000, feedback 2000, delay 500
    assert_eq!(starts, vec![500, 4_200]);
}

#[test]
fn early_presses_loop_until_a_clean_delay() {
    let spec = BlockSpec::new("R1", vec![sure_win()], 1).with_delay(quick_delay());
    let mut block = BlockSequencer::new(spec).unwrap();
    let input = ScriptedInput::new()
        .on_delay([Some(100), Some(50), Some(10), None])
        .on_stimulus([Some(200)]);
    let mut driver = Driver::new(VirtualClock::new(), input);
    let mut ctx = SessionContext::new(Some(3));
    let mut recorder = MemoryRecorder::new();
    let mut renderer = MemoryRenderer::new();

    let summary = block
        .run(&mut ctx, &mut driver, &mut renderer, &mut recorder)
        .unwrap();

    assert_eq!(summary.early_responses, 3);
    let history = block.history();
    let trial_at = history
        .iter()
        .position(|p| *p == BlockPhase::ActiveTrial)
        .unwrap();
    assert_eq!(history[trial_at - 1], BlockPhase::Delay);
    for pair in history.windows(2) {
        if pair[0] == BlockPhase::EarlyWarning {
            assert_eq!(pair[1], BlockPhase::Delay);
        }
    }
    assert_eq!(
        history.iter().filter(|p| **p == BlockPhase::EarlyWarning).count(),
        3
    );
    assert_eq!(recorder.records[0].outcome, TrialOutcome::WW);
    assert_eq!(recorder.records[0].early_responses, 3);
    assert!(renderer.calls.iter().any(|call| matches!(
        call,
        streak_experiment::RenderCall::Show { element: ElementId::Feedback, html } if html.contains("Too Fast")
    )));
}

#[test]
fn retry_cap_abandons_the_slot() {
    let delay = DelayPolicy {
        max_early_retries: Some(1),
        ..quick_delay()
    };
    let spec = BlockSpec::new("R1", vec![sure_win()], 2).with_delay(delay);
    let mut block = BlockSequencer::new(spec).unwrap();
    let input = ScriptedInput::new()
        .on_delay([Some(50), Some(50), None])
        .on_stimulus([Some(200)]);
    let mut driver = Driver::new(VirtualClock::new(), input);
    let mut ctx = SessionContext::new(Some(3));
    let mut recorder = MemoryRecorder::new();

    let summary = block
        .run(&mut ctx, &mut driver, &mut NullRenderer, &mut recorder)
        .unwrap();

    assert_eq!(summary.abandoned, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(recorder.abandoned.len(), 1);
    assert_eq!(recorder.abandoned[0].early_responses, 2);
    assert_eq!(recorder.abandoned[0].trial_index, 0);
    assert_eq!(recorder.records[0].trial_index, 1);
    assert_eq!(recorder.records[0].block_trial, 1);
}

#[test]
fn counters_reset_between_blocks() {
    let config = ExperimentConfig {
        seed: Some(8),
        blocks: vec![
            BlockSpec::new("R1", vec![sure_win()], 2).with_delay(quick_delay()),
            BlockSpec::new("R2", vec![sure_win()], 2)
                .with_delay(quick_delay())
                .with_feedback(FeedbackPolicy::Rounds {
                    points: 5,
                    chances: 5,
                }),
        ],
    };
    let input = ScriptedInput::new().on_stimulus([Some(200); 4]);
    let mut driver = Driver::new(VirtualClock::new(), input);
    let mut recorder = MemoryRecorder::new();

    let summaries =
        run_experiment(&config, &mut driver, &mut NullRenderer, &mut recorder).unwrap();

    assert_eq!(summaries[0].totals.participant, 20);
    assert_eq!(summaries[1].totals.participant, 10);
    let r2_first = &recorder.records[2];
    assert_eq!(r2_first.block, "R2");
    assert_eq!(r2_first.totals.participant, 5);
    assert_eq!(r2_first.trial_index, 2);
    assert_eq!(r2_first.block_trial, 0);
}

#[test]
fn json_lines_output_parses_back() {
    let config = ExperimentConfig {
        seed: Some(1),
        blocks: vec![BlockSpec::new("R1", vec![sure_win(), sure_loss()], 1).with_delay(quick_delay())],
    };
    let input = ScriptedInput::new().on_stimulus([Some(200), None]);
    let mut driver = Driver::new(VirtualClock::new(), input);
    let mut recorder = JsonLinesRecorder::new(Vec::new());

    run_experiment(&config, &mut driver, &mut NullRenderer, &mut recorder).unwrap();

    let text = String::from_utf8(recorder.into_inner()).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["type"], "trial");
    assert_eq!(lines[0]["outcome"], "WW");
    assert_eq!(lines[1]["outcome"], "LL");
    assert_eq!(lines[1]["config"]["response_deadline_ms"], 250);
}

#[test]
fn invalid_block_surfaces_config_error() {
    let config = ExperimentConfig {
        seed: Some(1),
        blocks: vec![BlockSpec::new("bad", vec![sure_win().with_deadline(0)], 1)],
    };
    let mut driver = Driver::new(VirtualClock::new(), ScriptedInput::new());
    let err = run_experiment(&config, &mut driver, &mut NullRenderer, &mut MemoryRecorder::new())
        .unwrap_err();
    assert!(matches!(err, streak_experiment::EngineError::Config { ref block, .. } if block == "bad"));
}

#[test]
fn zero_earn_ratio_withholds_every_hit() {
    let spec = BlockSpec::new("R1", vec![sure_win()], 4)
        .with_delay(quick_delay())
        .with_earned_per_ten(0);
    let mut block = BlockSequencer::new(spec).unwrap();
    let input = ScriptedInput::new().on_stimulus([Some(200); 4]);
    let mut driver = Driver::new(VirtualClock::new(), input);
    let mut ctx = SessionContext::new(Some(2));
    let mut recorder = MemoryRecorder::new();

    let summary = block
        .run(&mut ctx, &mut driver, &mut NullRenderer, &mut recorder)
        .unwrap();

    assert_eq!(summary.outcomes.ww, 4);
    assert!(recorder.records.iter().all(|r| !r.credited));
    // The partner is still scored on the race itself.
    assert_eq!(
        summary.totals,
        ScoreBoard {
            participant: 0,
            partner: 40
        }
    );
    let json = serde_json::to_value(&recorder.records[0]).unwrap();
    assert_eq!(json["credited"], false);
    assert_eq!(json["outcome"], "WW");
}

#[test]
fn earn_ratio_holds_over_a_deck_of_ten() {
    let spec = BlockSpec::new("R1", vec![sure_win()], 10)
        .with_delay(quick_delay())
        .with_earned_per_ten(6);
    let mut block = BlockSequencer::new(spec).unwrap();
    let input = ScriptedInput::new().on_stimulus([Some(200); 10]);
    let mut driver = Driver::new(VirtualClock::new(), input);
    let mut ctx = SessionContext::new(Some(11));
    let mut recorder = MemoryRecorder::new();

    let summary = block
        .run(&mut ctx, &mut driver, &mut NullRenderer, &mut recorder)
        .unwrap();

    let credited = recorder.records.iter().filter(|r| r.credited).count();
    assert_eq!(credited, 6);
    assert_eq!(summary.totals.participant, 60);
    assert_eq!(summary.totals.partner, 100);
}

#[test]
fn abandoning_the_last_slot_completes_the_block() {
    let delay = DelayPolicy {
        max_early_retries: Some(0),
        ..quick_delay()
    };
    let spec = BlockSpec::new("R1", vec![sure_win()], 1).with_delay(delay);
    let mut block = BlockSequencer::new(spec).unwrap();
    let input = ScriptedInput::new().on_delay([Some(50)]);
    let mut driver = Driver::new(VirtualClock::new(), input);
    let mut ctx = SessionContext::new(Some(3));
    let mut recorder = MemoryRecorder::new();

    let summary = block
        .run(&mut ctx, &mut driver, &mut NullRenderer, &mut recorder)
        .unwrap();

    assert_eq!(summary.abandoned, 1);
    assert_eq!(summary.outcomes.total(), 0);
    assert!(recorder.records.is_empty());
    assert_eq!(
        block.history(),
        &[BlockPhase::Delay, BlockPhase::EarlyWarning, BlockPhase::Complete]
    );
    assert_eq!(driver.pending_timers(), 0);
}
