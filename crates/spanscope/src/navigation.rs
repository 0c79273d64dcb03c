//! Navigation state management
//!
//! This module tracks which spans are expanded, which span is selected and
//! the breadcrumb path leading to it. All changes go through
//! [`NavigationController::apply`], one event at a time, so the state a view
//! reads is always a consistent snapshot.

use spanscope_protocol::{Span, SpanId};
use std::collections::HashSet;

use crate::tree::SpanTree;

/// Which projection of the trace is shown
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Waterfall,
    Tree,
}

impl ViewMode {
    /// Get the display label for this mode
    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Waterfall => "Waterfall",
            ViewMode::Tree => "Tree",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Waterfall => ViewMode::Tree,
            ViewMode::Tree => ViewMode::Waterfall,
        }
    }
}

/// Selection half of the state machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection<'a> {
    NoSelection,
    Selected(&'a SpanId),
}

/// User intent, applied by [`NavigationController::apply`]
#[derive(Clone, Debug, PartialEq)]
pub enum NavEvent {
    /// Select a span and rebuild the breadcrumb leading to it
    SelectSpan(SpanId),
    /// Flip a span between expanded and collapsed
    ToggleExpand(SpanId),
    /// A tree was (re)built; expand exactly its roots
    TreeLoaded(Vec<SpanId>),
    /// Drop the selection and its breadcrumb
    ClearSelection,
    /// Hide the detail panel but keep the selection
    CloseDetail,
    SetMode(ViewMode),
    ExpandAll,
    CollapseAll,
}

/// Whether an event changed the navigation state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Changed,
    Unchanged,
}

impl Transition {
    pub fn changed(self) -> bool {
        self == Transition::Changed
    }

    fn from_changed(changed: bool) -> Self {
        if changed {
            Transition::Changed
        } else {
            Transition::Unchanged
        }
    }
}

/// Snapshot of navigation state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NavigationState {
    expanded: HashSet<SpanId>,
    selected: Option<SpanId>,
    breadcrumb: Vec<Span>,
    mode: ViewMode,
    detail_open: bool,
}

impl NavigationState {
    pub fn expanded_ids(&self) -> &HashSet<SpanId> {
        &self.expanded
    }

    pub fn is_expanded(&self, span_id: &SpanId) -> bool {
        self.expanded.contains(span_id)
    }

    pub fn selected_id(&self) -> Option<&SpanId> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, span_id: &SpanId) -> bool {
        self.selected.as_ref() == Some(span_id)
    }

    pub fn selection(&self) -> Selection<'_> {
        match &self.selected {
            Some(id) => Selection::Selected(id),
            None => Selection::NoSelection,
        }
    }

    /// Spans from the root down to the selection, inclusive
    pub fn breadcrumb(&self) -> &[Span] {
        &self.breadcrumb
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn is_detail_open(&self) -> bool {
        self.detail_open && self.selected.is_some()
    }
}

/// Applies [`NavEvent`]s to a [`NavigationState`]
#[derive(Clone, Debug, Default)]
pub struct NavigationController {
    state: NavigationState,
}

impl NavigationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    /// Apply one event against the tree currently on screen
    pub fn apply(&mut self, event: NavEvent, tree: &SpanTree) -> Transition {
        tracing::debug!(?event, "navigation event");
        let state = &mut self.state;

        match event {
            NavEvent::SelectSpan(span_id) => {
                let Some(node) = tree.get(&span_id) else {
                    tracing::debug!(%span_id, "ignoring selection of unknown span");
                    return Transition::Unchanged;
                };

                let breadcrumb: Vec<Span> = tree
                    .ancestry(node)
                    .into_iter()
                    .map(|id| tree.node(id).span().clone())
                    .collect();

                let changed = state.selected.as_ref() != Some(&span_id)
                    || state.breadcrumb != breadcrumb
                    || !state.detail_open;
                state.selected = Some(span_id);
                state.breadcrumb = breadcrumb;
                state.detail_open = true;
                Transition::from_changed(changed)
            }
            NavEvent::ToggleExpand(span_id) => {
                let has_children = tree
                    .get(&span_id)
                    .is_some_and(|id| tree.node(id).has_children());
                if !has_children {
                    return Transition::Unchanged;
                }
                if !state.expanded.remove(&span_id) {
                    state.expanded.insert(span_id);
                }
                Transition::Changed
            }
            NavEvent::TreeLoaded(root_ids) => {
                let expanded: HashSet<SpanId> = root_ids.into_iter().collect();
                let changed = state.expanded != expanded;
                state.expanded = expanded;
                Transition::from_changed(changed)
            }
            NavEvent::ClearSelection => {
                let changed = state.selected.is_some() || !state.breadcrumb.is_empty();
                state.selected = None;
                state.breadcrumb.clear();
                state.detail_open = false;
                Transition::from_changed(changed)
            }
            NavEvent::CloseDetail => {
                let changed = state.detail_open;
                state.detail_open = false;
                Transition::from_changed(changed)
            }
            NavEvent::SetMode(mode) => {
                let changed = state.mode != mode;
                state.mode = mode;
                Transition::from_changed(changed)
            }
            NavEvent::ExpandAll => {
                let before = state.expanded.len();
                state.expanded.extend(
                    tree.pre_order()
                        .filter(|(_, node)| node.has_children())
                        .map(|(_, node)| node.span_id().clone()),
                );
                Transition::from_changed(state.expanded.len() != before)
            }
            NavEvent::CollapseAll => {
                let changed = !state.expanded.is_empty();
                state.expanded.clear();
                Transition::from_changed(changed)
            }
        }
    }

    /// Forget selection, breadcrumb and expansion; the view mode survives.
    pub fn reset(&mut self) {
        let mode = self.state.mode;
        self.state = NavigationState {
            mode,
            ..Default::default()
        };
    }

    /// Forget selection and breadcrumb only
    pub fn clear_selection(&mut self) {
        self.state.selected = None;
        self.state.breadcrumb.clear();
        self.state.detail_open = false;
    }
}
