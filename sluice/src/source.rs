/// Cursor-style access to a run of bytes.
///
/// A `Source` has a current position, lets callers look at upcoming bytes
/// without consuming them, and supports cheap repositioning within the
/// current *anchored window* (see [`set_anchor`][Source::set_anchor]).
///
/// Positions are absolute byte offsets from the start of the input. For
/// streaming sources only the anchored window is guaranteed to remain
/// addressable; [`seek`][Source::seek] and [`slice`][Source::slice] outside
/// of it may panic.
pub trait Source {
    /// Absolute byte offset of the cursor from the start of the input.
    fn position(&self) -> usize;

    /// Returns the byte at the cursor without consuming it, or `None` at the
    /// end of the input.
    fn peek(&mut self) -> Option<u8>;

    /// Returns the byte `offset` positions past the cursor without consuming
    /// anything, or `None` if the input ends before it.
    fn peek_at(&mut self, offset: usize) -> Option<u8>;

    /// Returns whether the cursor is at the end of the input.
    #[inline]
    fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    /// Advances the cursor by `n` bytes.
    ///
    /// The bytes must have been observed via [`peek`][Source::peek],
    /// [`peek_at`][Source::peek_at] or [`matches`][Source::matches] first;
    /// advancing past the end of the input panics.
    fn advance(&mut self, n: usize);

    /// Repositions the cursor to the absolute position `pos`.
    ///
    /// `pos` must lie inside the anchored window, between the anchor and the
    /// furthest byte observed so far. Both directions are O(1).
    fn seek(&mut self, pos: usize);

    /// Compares the upcoming bytes against `needle` without consuming
    /// anything.
    ///
    /// Returns `false` when the input ends before `needle` does.
    #[inline]
    fn matches(&mut self, needle: &[u8]) -> bool {
        for (i, &byte) in needle.iter().enumerate() {
            if self.peek_at(i) != Some(byte) {
                return false;
            }
        }
        true
    }

    /// Starts a new anchored window at the current position.
    ///
    /// Bytes from the anchor on stay addressable for [`seek`][Source::seek]
    /// and [`slice`][Source::slice] until the anchor moves again. Bytes in
    /// front of the anchor may be discarded by streaming sources.
    fn set_anchor(&mut self);

    /// Returns `len` raw bytes starting at absolute position `pos`.
    ///
    /// The region must have been observed already and must lie inside the
    /// anchored window.
    fn slice(&self, pos: usize, len: usize) -> &[u8];
}
