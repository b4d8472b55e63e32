//! Buffers pending key tokens against a [`MappingTrie`] and folds resolved
//! bindings through [`PendingContext`] into dispatchable commands. Mirrors
//! the teacher's NGI timeout/pending-state bookkeeping: an ambiguous match
//! (a bound key that is also a prefix of a longer binding) waits for either
//! the next key or [`KeyResolver::flush_pending`] once the caller's timeout
//! elapses.

use std::time::{Duration, Instant};

use core_events::KeyToken;
use core_keymap::{Command, MappingOutput, MappingTrie, PendingContext, Resolution, compose_with_context};
use smallvec::SmallVec;

/// How long to wait for a further key before resolving an ambiguous match
/// as final.
pub const AMBIGUOUS_TIMEOUT: Duration = Duration::from_millis(500);

pub struct KeyResolver {
    trie: MappingTrie,
    ctx: PendingContext,
    buffer: SmallVec<[KeyToken; 4]>,
    deadline: Option<Instant>,
}

impl KeyResolver {
    pub fn new(trie: MappingTrie) -> Self {
        Self {
            trie,
            ctx: PendingContext::default(),
            buffer: SmallVec::new(),
            deadline: None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Feed one decoded key token. Returns a command immediately for an
    /// unambiguous match or a literal fallback; returns `None` while the
    /// buffer is still a prefix of a longer binding (including ambiguous
    /// matches, which wait for [`Self::flush_pending`] or another key).
    pub fn feed(&mut self, token: KeyToken) -> Option<Command> {
        self.buffer.push(token);
        match self.trie.resolve(&self.buffer) {
            Resolution::Matched { consumed, output, ambiguous: false } => {
                self.buffer.drain(0..consumed);
                self.deadline = None;
                Some(compose_with_context(&mut self.ctx, &output))
            }
            Resolution::Matched { ambiguous: true, .. } => {
                self.deadline = Some(Instant::now() + AMBIGUOUS_TIMEOUT);
                None
            }
            Resolution::NeedMore => {
                self.deadline = Some(Instant::now() + AMBIGUOUS_TIMEOUT);
                None
            }
            Resolution::FallbackLiteral(tok) => {
                self.buffer.clear();
                self.deadline = None;
                match tok {
                    KeyToken::Char(c) => Some(compose_with_context(&mut self.ctx, &MappingOutput::Literal(c))),
                    _ => None,
                }
            }
        }
    }

    /// Force-resolve a buffered ambiguous/partial match once its deadline
    /// has elapsed. Returns `None` and clears the buffer if nothing in it
    /// was ever a complete binding.
    pub fn flush_pending(&mut self) -> Option<Command> {
        if self.buffer.is_empty() {
            return None;
        }
        let result = match self.trie.resolve(&self.buffer) {
            Resolution::Matched { consumed, output, .. } => {
                self.buffer.drain(0..consumed);
                Some(compose_with_context(&mut self.ctx, &output))
            }
            _ => None,
        };
        self.buffer.clear();
        self.deadline = None;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_keymap::{Motion, default_viewer_specs};

    #[test]
    fn single_key_resolves_immediately() {
        let mut r = KeyResolver::new(MappingTrie::build(default_viewer_specs()));
        let cmd = r.feed(KeyToken::Char('j'));
        assert_eq!(cmd, Some(Command::Move { motion: Motion::Down, count: 1 }));
        assert!(r.deadline().is_none());
    }

    #[test]
    fn prefix_of_gg_waits_then_resolves() {
        let mut r = KeyResolver::new(MappingTrie::build(default_viewer_specs()));
        assert_eq!(r.feed(KeyToken::Char('g')), None);
        assert!(r.deadline().is_some());
        assert_eq!(r.feed(KeyToken::Char('g')), Some(Command::GotoTop));
    }

    #[test]
    fn timed_out_prefix_flushes_to_nothing_if_incomplete() {
        let mut r = KeyResolver::new(MappingTrie::build(default_viewer_specs()));
        assert_eq!(r.feed(KeyToken::Char('g')), None);
        assert_eq!(r.flush_pending(), None);
        assert!(r.deadline().is_none());
    }

    #[test]
    fn unbound_key_falls_back_to_literal_command() {
        let mut r = KeyResolver::new(MappingTrie::build(default_viewer_specs()));
        let cmd = r.feed(KeyToken::Char('Z'));
        assert_eq!(cmd, Some(Command::Literal('Z')));
    }

    #[test]
    fn count_prefix_then_motion() {
        let mut r = KeyResolver::new(MappingTrie::build(default_viewer_specs()));
        assert_eq!(r.feed(KeyToken::Char('1')), Some(Command::Pending));
        assert_eq!(r.feed(KeyToken::Char('2')), Some(Command::Pending));
        assert_eq!(
            r.feed(KeyToken::Char('j')),
            Some(Command::Move { motion: Motion::Down, count: 12 })
        );
    }
}
