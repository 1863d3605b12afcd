use std::collections::HashSet;

use streak_core::{ColorToken, ElementId, Mode, Shape};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("render target `{0}` not found")]
    MissingElement(ElementId),
}

/// Display surface. The engine only ever replaces an element's content or
/// recolours it; layout and styling stay with the implementation.
pub trait Renderer {
    fn show(&mut self, element: ElementId, html: &str) -> Result<(), RenderError>;
    fn set_background(&mut self, element: ElementId, color: ColorToken) -> Result<(), RenderError>;
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn show(&mut self, _element: ElementId, _html: &str) -> Result<(), RenderError> {
        Ok(())
    }

    fn set_background(&mut self, _element: ElementId, _color: ColorToken) -> Result<(), RenderError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCall {
    Show { element: ElementId, html: String },
    Background { element: ElementId, color: ColorToken },
}

/// Records successful calls. Elements marked missing fail with
/// `RenderError::MissingElement`.
#[derive(Debug, Clone, Default)]
pub struct MemoryRenderer {
    pub calls: Vec<RenderCall>,
    missing: HashSet<ElementId>,
}

impl MemoryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without(mut self, element: ElementId) -> Self {
        self.missing.insert(element);
        self
    }

    pub fn backgrounds(&self, element: ElementId) -> Vec<ColorToken> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                RenderCall::Background { element: e, color } if *e == element => Some(*color),
                _ => None,
            })
            .collect()
    }

    pub fn last_html(&self, element: ElementId) -> Option<&str> {
        self.calls.iter().rev().find_map(|call| match call {
            RenderCall::Show { element: e, html } if *e == element => Some(html.as_str()),
            _ => None,
        })
    }

    fn check(&self, element: ElementId) -> Result<(), RenderError> {
        if self.missing.contains(&element) {
            return Err(RenderError::MissingElement(element));
        }
        Ok(())
    }
}

impl Renderer for MemoryRenderer {
    fn show(&mut self, element: ElementId, html: &str) -> Result<(), RenderError> {
        self.check(element)?;
        self.calls.push(RenderCall::Show {
            element,
            html: html.to_string(),
        });
        Ok(())
    }

    fn set_background(&mut self, element: ElementId, color: ColorToken) -> Result<(), RenderError> {
        self.check(element)?;
        self.calls.push(RenderCall::Background { element, color });
        Ok(())
    }
}

/// Render failures never abort a trial; they are logged and dropped.
pub(crate) fn show(renderer: &mut dyn Renderer, element: ElementId, html: &str) {
    if let Err(err) = renderer.show(element, html) {
        tracing::warn!(%element, %err, "display update skipped");
    }
}

pub(crate) fn paint(renderer: &mut dyn Renderer, element: ElementId, color: ColorToken) {
    if let Err(err) = renderer.set_background(element, color) {
        tracing::warn!(%element, ?color, %err, "recolour skipped");
    }
}

/// Markup for the trial stimulus: an inner shape for the participant,
/// wrapped in an outer shape for the partner in group mode.
pub fn stimulus_html(shape: Shape, mode: Mode) -> String {
    let class = match shape {
        Shape::Circle => "circle",
        Shape::Square => "box",
    };
    let inner = format!(
        r#"<div id="{}" class="{class} inner"></div>"#,
        ElementId::Participant
    );
    match mode {
        Mode::Solo => inner,
        Mode::Group => format!(
            r#"<div id="{}" class="{class} outer">{inner}</div>"#,
            ElementId::Partner
        ),
    }
}
