//! Pointer events and the click-vs-drag state machine.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
    Enter,
    Leave,
    ContextMenu,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MouseButton {
    #[default]
    Primary,
    Auxiliary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub button: MouseButton,
    /// Surface-relative pointer position, in pixels.
    pub client_x: f64,
    pub client_y: f64,
}

impl PointerEvent {
    pub fn new(kind: PointerEventKind, client_x: f64, client_y: f64) -> Self {
        Self {
            kind,
            button: MouseButton::Primary,
            client_x,
            client_y,
        }
    }

    pub fn down(client_x: f64, client_y: f64) -> Self {
        Self::new(PointerEventKind::Down, client_x, client_y)
    }

    pub fn moved(client_x: f64, client_y: f64) -> Self {
        Self::new(PointerEventKind::Move, client_x, client_y)
    }

    pub fn up(client_x: f64, client_y: f64) -> Self {
        Self::new(PointerEventKind::Up, client_x, client_y)
    }

    pub fn enter() -> Self {
        Self::new(PointerEventKind::Enter, 0.0, 0.0)
    }

    pub fn leave() -> Self {
        Self::new(PointerEventKind::Leave, 0.0, 0.0)
    }

    pub fn context_menu(client_x: f64, client_y: f64) -> Self {
        Self {
            button: MouseButton::Secondary,
            ..Self::new(PointerEventKind::ContextMenu, client_x, client_y)
        }
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }
}

/// What handling an event did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// The platform default action (e.g. the native context menu) must not run.
    pub default_prevented: bool,
    pub callbacks_fired: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClickState {
    #[default]
    Idle,
    Pressed,
    Dragging,
}

/// Tells clicks from pan gestures on one element.
///
/// `Idle --down--> Pressed --move--> Dragging`; only `Pressed --up-->` is a click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickTracker {
    state: ClickState,
}

impl ClickTracker {
    pub fn state(&self) -> ClickState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = ClickState::Idle;
    }

    /// Feeds an event; returns `true` when it completes a primary-button click.
    pub fn handle(&mut self, event: &PointerEvent) -> bool {
        match event.kind {
            PointerEventKind::Down => {
                self.state = if event.button == MouseButton::Primary {
                    ClickState::Pressed
                } else {
                    ClickState::Idle
                };
                false
            }
            PointerEventKind::Move => {
                if self.state == ClickState::Pressed {
                    self.state = ClickState::Dragging;
                }
                false
            }
            PointerEventKind::Up => {
                let clicked =
                    self.state == ClickState::Pressed && event.button == MouseButton::Primary;
                self.state = ClickState::Idle;
                clicked
            }
            _ => false,
        }
    }
}
