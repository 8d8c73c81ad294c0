//! Send-control detection on capture-phase clicks

use once_cell::sync::Lazy;

use crate::page::{ClickEvent, Element, NodeId, RenderedTree, Selector};

/// One way of recognising the send control
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendControlStrategy {
    /// Element matching the selector
    Matches(Selector),
    /// Element matching `control` with a descendant matching `marker`
    Containing { control: Selector, marker: Selector },
}

/// Ways the send control has been marked up over time, tried in order
static SEND_CONTROL_STRATEGIES: Lazy<Vec<SendControlStrategy>> = Lazy::new(|| {
    vec![
        SendControlStrategy::Containing {
            control: Selector::builtin("button"),
            marker: Selector::builtin(r#"mat-icon[data-mat-icon-name="send"]"#),
        },
        SendControlStrategy::Matches(Selector::builtin("button.send-button")),
        SendControlStrategy::Matches(Selector::builtin(r#"button[aria-label*="Send"]"#)),
        SendControlStrategy::Matches(Selector::builtin(r#"button[data-test-id="send-button"]"#)),
    ]
});

#[derive(Debug, Clone)]
pub struct SendControlDetector {
    strategies: Vec<SendControlStrategy>,
}

impl Default for SendControlDetector {
    fn default() -> Self {
        Self::with_strategies(SEND_CONTROL_STRATEGIES.clone())
    }
}

impl SendControlDetector {
    pub fn with_strategies(strategies: Vec<SendControlStrategy>) -> Self {
        Self { strategies }
    }

    /// Nearest element on the click path matching the first strategy that
    /// matches anything
    pub fn find_send_control<'e>(&self, event: &'e ClickEvent) -> Option<&'e Element> {
        let target = event.path.first()?.id;
        let tree = RenderedTree::new(event.path.last()?);
        let id = self
            .strategies
            .iter()
            .find_map(|strategy| closest(&tree, target, strategy))?;
        event.path.iter().find(|element| element.id == id)
    }

    pub fn is_enabled(control: &Element) -> bool {
        control.attr("aria-disabled") != Some("true") && control.attr("disabled").is_none()
    }

    /// True iff the click landed on (or inside) an enabled send control
    pub fn is_send_click(&self, event: &ClickEvent) -> bool {
        match self.find_send_control(event) {
            Some(control) => Self::is_enabled(control),
            None => false,
        }
    }
}

fn closest(tree: &RenderedTree, target: NodeId, strategy: &SendControlStrategy) -> Option<NodeId> {
    match strategy {
        SendControlStrategy::Matches(selector) => tree.closest(target, selector),
        SendControlStrategy::Containing { control, marker } => {
            let mut from = target;
            loop {
                let hit = tree.closest(from, control)?;
                if tree.has_descendant(hit, marker) {
                    return Some(hit);
                }
                from = tree.parent(hit)?;
            }
        }
    }
}
