//! Host page capabilities.
//!
//! The manager never touches a browser directly. Whatever embeds it supplies
//! a [`Host`] for reading and changing page state, and forwards page events
//! as a stream of [`PageEvent`]s.

/// What the manager may ask of the page.
pub trait Host {
    /// Current full address, fragment included.
    fn location(&self) -> String;

    /// Replaces the visible address without navigating or adding a history
    /// entry, and without triggering the page's own anchor jump.
    fn replace_location(&mut self, location: &str);

    /// Current vertical scroll offset.
    fn scroll_offset(&self) -> u64;

    /// Scrolls the viewport to `offset`.
    fn scroll_to(&mut self, offset: u64);

    /// Document offset of the element with `id`, or `None` if it does not exist.
    fn element_offset(&self, id: &str) -> Option<u64>;

    /// Asks for a [`PageEvent::Frame`] at the next paint opportunity.
    fn request_frame(&mut self);
}

/// Events the host forwards to the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    /// The viewport scrolled.
    Scroll,
    /// Content and layout are complete.
    ContentReady,
    /// A frame requested through [`Host::request_frame`] is about to paint.
    Frame,
    /// The page is about to be navigated away from.
    BeforeUnload,
    /// The page became hidden (tab switch, app backgrounded).
    VisibilityHidden,
}

impl PageEvent {
    /// Whether this event must commit the current position immediately.
    pub fn is_exit(&self) -> bool {
        matches!(self, PageEvent::BeforeUnload | PageEvent::VisibilityHidden)
    }
}
