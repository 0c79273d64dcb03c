//! Interactive state: the trace list, the span cursor, and the session.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;
use std::sync::Arc;

use spanscope::render::{self, Panel};
use spanscope::{
    FetchOutcome, NavEvent, RenderConfig, Resolution, SpanId, TraceFilter, TraceLoader, TraceSession,
    TraceSummary, Transition,
};
use spanscope_store::TraceStore;

/// Which pane receives navigation keys
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    TraceList,
    Spans,
}

impl Focus {
    fn toggled(self) -> Self {
        match self {
            Focus::TraceList => Focus::Spans,
            Focus::Spans => Focus::TraceList,
        }
    }
}

pub struct App {
    pub session: TraceSession,
    pub config: RenderConfig,
    pub traces: Vec<TraceSummary>,
    pub trace_list: ListState,
    pub focus: Focus,
    /// Row index of the highlighted span in the active view
    pub span_cursor: usize,
    pub should_quit: bool,
    store: Arc<TraceStore>,
    loader: TraceLoader<TraceStore>,
}

impl App {
    pub fn new(
        store: Arc<TraceStore>,
        config: RenderConfig,
    ) -> (Self, tokio::sync::mpsc::UnboundedReceiver<FetchOutcome>) {
        let (loader, outcomes) = TraceLoader::new(Arc::clone(&store));
        let mut app = Self {
            session: TraceSession::new(),
            config,
            traces: Vec::new(),
            trace_list: ListState::default(),
            focus: Focus::default(),
            span_cursor: 0,
            should_quit: false,
            store,
            loader,
        };
        app.refresh_traces();
        (app, outcomes)
    }

    /// Re-read the trace list, keeping the highlighted trace when possible
    pub fn refresh_traces(&mut self) {
        let highlighted = self.highlighted_trace().map(|s| s.trace_id.clone());
        self.traces = self.store.list_traces(&TraceFilter::default());

        let index = highlighted
            .and_then(|id| self.traces.iter().position(|s| s.trace_id == id))
            .or_else(|| (!self.traces.is_empty()).then_some(0));
        self.trace_list.select(index);
    }

    pub fn highlighted_trace(&self) -> Option<&TraceSummary> {
        self.trace_list.selected().and_then(|i| self.traces.get(i))
    }

    /// Start loading a trace; whatever was in flight is abandoned
    pub fn open_trace(&mut self, trace_id: impl Into<spanscope::TraceId>) {
        let ticket = self.session.request(trace_id);
        tracing::info!(trace_id = %ticket.trace_id(), "opening trace");
        self.span_cursor = 0;
        self.loader.fetch(ticket);
    }

    pub fn on_fetch(&mut self, (ticket, result): FetchOutcome) {
        if self.session.resolve(&ticket, result) == Resolution::Applied {
            self.span_cursor = 0;
        }
    }

    /// Span ids of the rows currently on screen, top to bottom
    pub fn visible_span_ids(&self) -> Vec<SpanId> {
        let view = self.session.view();
        match view.nav.mode() {
            spanscope::ViewMode::Waterfall => match render::waterfall(&view, &self.config) {
                Panel::Ready(rows) => rows.into_iter().map(|row| row.span_id).collect(),
                _ => Vec::new(),
            },
            spanscope::ViewMode::Tree => match render::tree(&view, &self.config) {
                Panel::Ready(rows) => rows.into_iter().map(|row| row.span_id).collect(),
                _ => Vec::new(),
            },
        }
    }

    fn span_under_cursor(&self) -> Option<SpanId> {
        self.visible_span_ids().into_iter().nth(self.span_cursor)
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible_span_ids().len();
        self.span_cursor = self.span_cursor.min(len.saturating_sub(1));
    }

    fn move_cursor(&mut self, delta: isize) {
        match self.focus {
            Focus::TraceList => {
                if self.traces.is_empty() {
                    return;
                }
                let current = self.trace_list.selected().unwrap_or(0);
                let next = current
                    .saturating_add_signed(delta)
                    .min(self.traces.len() - 1);
                self.trace_list.select(Some(next));
            }
            Focus::Spans => {
                self.span_cursor = self.span_cursor.saturating_add_signed(delta);
                self.clamp_cursor();
            }
        }
    }

    fn dispatch(&mut self, event: NavEvent) -> bool {
        let changed = self.session.dispatch(event) == Transition::Changed;
        if changed {
            self.clamp_cursor();
        }
        changed
    }

    /// Apply one key press. Returns whether anything needs redrawing.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            self.should_quit = true;
            return true;
        }

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                true
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = self.focus.toggled();
                true
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_cursor(1);
                true
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_cursor(-1);
                true
            }
            KeyCode::PageDown => {
                self.move_cursor(10);
                true
            }
            KeyCode::PageUp => {
                self.move_cursor(-10);
                true
            }
            KeyCode::Enter => match self.focus {
                Focus::TraceList => {
                    let Some(trace_id) = self.highlighted_trace().map(|s| s.trace_id.clone()) else {
                        return false;
                    };
                    self.open_trace(trace_id);
                    self.focus = Focus::Spans;
                    true
                }
                Focus::Spans => match self.span_under_cursor() {
                    Some(span_id) => self.dispatch(NavEvent::SelectSpan(span_id)),
                    None => false,
                },
            },
            KeyCode::Char(' ') | KeyCode::Right | KeyCode::Left | KeyCode::Char('l') | KeyCode::Char('h')
                if self.focus == Focus::Spans =>
            {
                match self.span_under_cursor() {
                    Some(span_id) => self.toggle_if(span_id, key.code),
                    None => false,
                }
            }
            KeyCode::Char('m') => {
                let mode = self.session.navigation().mode().toggled();
                self.dispatch(NavEvent::SetMode(mode))
            }
            KeyCode::Char('e') => self.dispatch(NavEvent::ExpandAll),
            KeyCode::Char('E') => self.dispatch(NavEvent::CollapseAll),
            KeyCode::Char('c') => self.dispatch(NavEvent::ClearSelection),
            KeyCode::Esc => {
                if self.session.navigation().is_detail_open() {
                    self.dispatch(NavEvent::CloseDetail)
                } else {
                    self.dispatch(NavEvent::ClearSelection)
                }
            }
            KeyCode::Char('r') => match self.session.active_trace().cloned() {
                Some(trace_id) => {
                    self.open_trace(trace_id);
                    true
                }
                None => false,
            },
            KeyCode::Char('R') => {
                self.refresh_traces();
                true
            }
            _ => false,
        }
    }

    /// Space toggles; Right only expands and Left only collapses.
    fn toggle_if(&mut self, span_id: SpanId, code: KeyCode) -> bool {
        let expanded = self.session.navigation().is_expanded(&span_id);
        let wanted = match code {
            KeyCode::Right | KeyCode::Char('l') => !expanded,
            KeyCode::Left | KeyCode::Char('h') => expanded,
            _ => true,
        };
        wanted && self.dispatch(NavEvent::ToggleExpand(span_id))
    }
}
