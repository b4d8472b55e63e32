//! Key-chord -> command binding table.
//!
//! Keys are resolved through a small trie so multi-key sequences (`gg`) and
//! single keys share one lookup, with an explicit `NeedMore` result when the
//! buffer is a prefix of a longer binding. A `PendingContext` accumulates a
//! leading count prefix (`12j`) the way a modal editor's count/operator
//! state does, but there are no operators here — the viewer has motions and
//! toggles, not text objects.

use core_events::{KeyToken, NamedKey};
use smallvec::SmallVec;

/// What a single key sequence means before count composition is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingOutput {
    CountDigit(char),
    Motion(Motion),
    ToggleHexMode,
    ToggleWrap,
    ToggleLineEndings,
    ToggleCaseless,
    ToggleRegex,
    ToggleMultiFile,
    FindForward,
    FindBackward,
    FindNext,
    FindPrev,
    Save,
    UndoSave,
    RevertByte,
    Quit,
    Cancel,
    /// Chooser-only actions; unused by the viewer's trie.
    Tag,
    Sweep,
    Rename,
    DeleteSelected,
    Open,
    /// Passed through verbatim — used for prompt text entry and hex nibble
    /// entry, where the active mode (not the keymap) decides what a
    /// character means.
    Literal(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Down,
    Up,
    PageDown,
    PageUp,
    HalfPageDown,
    HalfPageUp,
    Left,
    Right,
    LineStart,
    LineEnd,
    Top,
    Bottom,
}

/// Final, count-resolved command handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move { motion: Motion, count: u32 },
    GotoLine(u32),
    GotoTop,
    GotoBottom,
    ToggleHexMode,
    ToggleWrap,
    ToggleLineEndings,
    ToggleCaseless,
    ToggleRegex,
    ToggleMultiFile,
    FindForward,
    FindBackward,
    FindNext,
    FindPrev,
    Save,
    UndoSave,
    RevertByte,
    Quit,
    Cancel,
    Tag,
    Sweep,
    Rename,
    DeleteSelected,
    Open,
    Literal(char),
    /// A count digit was consumed but no motion followed yet; nothing to
    /// dispatch.
    Pending,
}

/// Count-prefix accumulator. Reset after every motion/command dispatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingContext {
    count_prefix: Option<u32>,
}

impl PendingContext {
    pub fn reset(&mut self) {
        self.count_prefix = None;
    }

    pub fn count(&self) -> Option<u32> {
        self.count_prefix
    }
}

/// Fold a raw trie output into a dispatchable command, applying (and then
/// clearing) any accumulated count prefix.
pub fn compose_with_context(ctx: &mut PendingContext, out: &MappingOutput) -> Command {
    match out {
        MappingOutput::CountDigit(c) => {
            let digit = c.to_digit(10).unwrap_or(0);
            ctx.count_prefix = Some(match ctx.count_prefix {
                None => digit,
                Some(prev) => prev.saturating_mul(10).saturating_add(digit),
            });
            Command::Pending
        }
        MappingOutput::Motion(Motion::Bottom) => {
            if let Some(n) = ctx.count_prefix.take() {
                Command::GotoLine(n)
            } else {
                Command::GotoBottom
            }
        }
        MappingOutput::Motion(Motion::Top) => {
            ctx.count_prefix = None;
            Command::GotoTop
        }
        MappingOutput::Motion(m) => {
            let count = ctx.count_prefix.take().unwrap_or(1).max(1);
            Command::Move { motion: *m, count }
        }
        other => {
            ctx.count_prefix = None;
            match other {
                MappingOutput::ToggleHexMode => Command::ToggleHexMode,
                MappingOutput::ToggleWrap => Command::ToggleWrap,
                MappingOutput::ToggleLineEndings => Command::ToggleLineEndings,
                MappingOutput::ToggleCaseless => Command::ToggleCaseless,
                MappingOutput::ToggleRegex => Command::ToggleRegex,
                MappingOutput::ToggleMultiFile => Command::ToggleMultiFile,
                MappingOutput::FindForward => Command::FindForward,
                MappingOutput::FindBackward => Command::FindBackward,
                MappingOutput::FindNext => Command::FindNext,
                MappingOutput::FindPrev => Command::FindPrev,
                MappingOutput::Save => Command::Save,
                MappingOutput::UndoSave => Command::UndoSave,
                MappingOutput::RevertByte => Command::RevertByte,
                MappingOutput::Quit => Command::Quit,
                MappingOutput::Cancel => Command::Cancel,
                MappingOutput::Tag => Command::Tag,
                MappingOutput::Sweep => Command::Sweep,
                MappingOutput::Rename => Command::Rename,
                MappingOutput::DeleteSelected => Command::DeleteSelected,
                MappingOutput::Open => Command::Open,
                MappingOutput::Literal(c) => Command::Literal(*c),
                MappingOutput::CountDigit(_) | MappingOutput::Motion(_) => unreachable!(),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct MappingSpec {
    pub sequence: SmallVec<[KeyToken; 2]>,
    pub output: MappingOutput,
}

impl MappingSpec {
    pub fn new(sequence: impl Into<SmallVec<[KeyToken; 2]>>, output: MappingOutput) -> Self {
        Self {
            sequence: sequence.into(),
            output,
        }
    }

    fn single(token: KeyToken, output: MappingOutput) -> Self {
        let mut seq = SmallVec::new();
        seq.push(token);
        Self {
            sequence: seq,
            output,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// `consumed` keys from the front of the buffer resolve to `output`.
    /// `ambiguous` is true when this match is itself a prefix of a longer
    /// binding still reachable from here (the caller may choose to fire
    /// early on a short timeout instead of waiting for more input).
    Matched {
        consumed: usize,
        output: MappingOutput,
        ambiguous: bool,
    },
    /// The buffer is a strict prefix of at least one longer binding; ask
    /// the caller for more input.
    NeedMore,
    /// No binding starts with the buffer's first key; it should be treated
    /// as a literal character (if printable) and the buffer reset.
    FallbackLiteral(KeyToken),
}

#[derive(Default)]
struct TrieNode {
    children: Vec<(KeyToken, TrieNode)>,
    leaf: Option<MappingOutput>,
}

impl TrieNode {
    fn child(&self, token: &KeyToken) -> Option<&TrieNode> {
        self.children
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, n)| n)
    }

    fn child_mut(&mut self, token: &KeyToken) -> &mut TrieNode {
        if let Some(pos) = self.children.iter().position(|(t, _)| t == token) {
            &mut self.children[pos].1
        } else {
            self.children.push((token.clone(), TrieNode::default()));
            &mut self.children.last_mut().unwrap().1
        }
    }
}

/// Compressed trie over key-token sequences, resolving the longest binding
/// that matches a prefix of the input buffer.
pub struct MappingTrie {
    root: TrieNode,
}

impl MappingTrie {
    pub fn build(specs: Vec<MappingSpec>) -> Self {
        let mut root = TrieNode::default();
        for spec in specs {
            let mut node = &mut root;
            for token in &spec.sequence {
                node = node.child_mut(token);
            }
            node.leaf = Some(spec.output);
        }
        Self { root }
    }

    /// Resolve as much of `buffer` as possible. `buffer` holds pending keys
    /// in the order pressed.
    pub fn resolve(&self, buffer: &[KeyToken]) -> Resolution {
        if buffer.is_empty() {
            return Resolution::NeedMore;
        }
        let mut node = &self.root;
        let mut last_leaf: Option<(usize, MappingOutput)> = None;
        for (i, token) in buffer.iter().enumerate() {
            match node.child(token) {
                Some(next) => {
                    node = next;
                    if let Some(output) = node.leaf {
                        last_leaf = Some((i + 1, output));
                    }
                }
                None => {
                    return match last_leaf {
                        Some((consumed, output)) => Resolution::Matched {
                            consumed,
                            output,
                            ambiguous: false,
                        },
                        None => Resolution::FallbackLiteral(buffer[0].clone()),
                    };
                }
            }
        }
        // Consumed the whole buffer without falling off the trie.
        match (node.leaf, node.children.is_empty()) {
            (Some(output), true) => Resolution::Matched {
                consumed: buffer.len(),
                output,
                ambiguous: false,
            },
            (Some(output), false) => Resolution::Matched {
                consumed: buffer.len(),
                output,
                ambiguous: true,
            },
            (None, true) => match last_leaf {
                Some((consumed, output)) => Resolution::Matched {
                    consumed,
                    output,
                    ambiguous: false,
                },
                None => Resolution::FallbackLiteral(buffer[0].clone()),
            },
            (None, false) => Resolution::NeedMore,
        }
    }
}

/// The viewer's default key bindings, in the teacher's "less"/vim-adjacent
/// idiom: hjkl + arrows for motion, `/`/`?` for search, `gg`/`G` for
/// top/bottom, Tab to flip hex mode.
pub fn default_viewer_specs() -> Vec<MappingSpec> {
    use KeyToken::{Char, Named};
    let mut specs = vec![
        MappingSpec::single(Char('j'), MappingOutput::Motion(Motion::Down)),
        MappingSpec::single(Named(NamedKey::Down), MappingOutput::Motion(Motion::Down)),
        MappingSpec::single(Char('k'), MappingOutput::Motion(Motion::Up)),
        MappingSpec::single(Named(NamedKey::Up), MappingOutput::Motion(Motion::Up)),
        MappingSpec::single(Char('h'), MappingOutput::Motion(Motion::Left)),
        MappingSpec::single(Named(NamedKey::Left), MappingOutput::Motion(Motion::Left)),
        MappingSpec::single(Char('l'), MappingOutput::Motion(Motion::Right)),
        MappingSpec::single(Named(NamedKey::Right), MappingOutput::Motion(Motion::Right)),
        MappingSpec::single(
            Named(NamedKey::PageDown),
            MappingOutput::Motion(Motion::PageDown),
        ),
        MappingSpec::single(
            Named(NamedKey::PageUp),
            MappingOutput::Motion(Motion::PageUp),
        ),
        MappingSpec::single(Char('f'), MappingOutput::Motion(Motion::PageDown)),
        MappingSpec::single(Char('b'), MappingOutput::Motion(Motion::PageUp)),
        MappingSpec::single(Char('d'), MappingOutput::Motion(Motion::HalfPageDown)),
        MappingSpec::single(Char('y'), MappingOutput::Motion(Motion::HalfPageUp)),
        MappingSpec::single(
            Named(NamedKey::Home),
            MappingOutput::Motion(Motion::LineStart),
        ),
        MappingSpec::single(Named(NamedKey::End), MappingOutput::Motion(Motion::LineEnd)),
        MappingSpec::single(Char('G'), MappingOutput::Motion(Motion::Bottom)),
        MappingSpec::new([Char('g'), Char('g')], MappingOutput::Motion(Motion::Top)),
        MappingSpec::single(Named(NamedKey::Tab), MappingOutput::ToggleHexMode),
        MappingSpec::single(Char('w'), MappingOutput::ToggleWrap),
        MappingSpec::single(Char('e'), MappingOutput::ToggleLineEndings),
        MappingSpec::single(Char('/'), MappingOutput::FindForward),
        MappingSpec::single(Char('?'), MappingOutput::FindBackward),
        MappingSpec::single(Char('n'), MappingOutput::FindNext),
        MappingSpec::single(Char('N'), MappingOutput::FindPrev),
        MappingSpec::single(Char('c'), MappingOutput::ToggleCaseless),
        MappingSpec::single(Char('r'), MappingOutput::ToggleRegex),
        MappingSpec::single(Char('m'), MappingOutput::ToggleMultiFile),
        MappingSpec::single(Char('u'), MappingOutput::RevertByte),
        MappingSpec::single(Char('S'), MappingOutput::Save),
        MappingSpec::single(Char('U'), MappingOutput::UndoSave),
        MappingSpec::single(Char('q'), MappingOutput::Quit),
        MappingSpec::single(Named(NamedKey::Esc), MappingOutput::Cancel),
    ];
    for d in '0'..='9' {
        specs.push(MappingSpec::single(Char(d), MappingOutput::CountDigit(d)));
    }
    specs
}

/// Minimal chooser bindings: the crate only has to get a selection to the
/// viewer and support the housekeeping ops (tag / sweep / rename / delete)
/// the CLI's directory listing exposes.
pub fn default_chooser_specs() -> Vec<MappingSpec> {
    use KeyToken::{Char, Named};
    vec![
        MappingSpec::single(Char('j'), MappingOutput::Motion(Motion::Down)),
        MappingSpec::single(Named(NamedKey::Down), MappingOutput::Motion(Motion::Down)),
        MappingSpec::single(Char('k'), MappingOutput::Motion(Motion::Up)),
        MappingSpec::single(Named(NamedKey::Up), MappingOutput::Motion(Motion::Up)),
        MappingSpec::single(Named(NamedKey::Enter), MappingOutput::Open),
        MappingSpec::single(Char('t'), MappingOutput::Tag),
        MappingSpec::single(Char('s'), MappingOutput::Sweep),
        MappingSpec::single(Char('R'), MappingOutput::Rename),
        MappingSpec::single(Named(NamedKey::Delete), MappingOutput::DeleteSelected),
        MappingSpec::single(Char('q'), MappingOutput::Quit),
        MappingSpec::single(Named(NamedKey::Esc), MappingOutput::Cancel),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_key_match() {
        let trie = MappingTrie::build(default_viewer_specs());
        let res = trie.resolve(&[KeyToken::Char('j')]);
        assert!(matches!(
            res,
            Resolution::Matched {
                consumed: 1,
                output: MappingOutput::Motion(Motion::Down),
                ..
            }
        ));
    }

    #[test]
    fn need_more_for_prefix_of_gg() {
        let trie = MappingTrie::build(default_viewer_specs());
        let res = trie.resolve(&[KeyToken::Char('g')]);
        assert_eq!(res, Resolution::NeedMore);
    }

    #[test]
    fn two_key_gg_resolves_to_top() {
        let trie = MappingTrie::build(default_viewer_specs());
        let res = trie.resolve(&[KeyToken::Char('g'), KeyToken::Char('g')]);
        assert!(matches!(
            res,
            Resolution::Matched {
                consumed: 2,
                output: MappingOutput::Motion(Motion::Top),
                ..
            }
        ));
    }

    #[test]
    fn unbound_key_falls_back_to_literal() {
        let trie = MappingTrie::build(default_viewer_specs());
        let res = trie.resolve(&[KeyToken::Char('Z')]);
        assert_eq!(res, Resolution::FallbackLiteral(KeyToken::Char('Z')));
    }

    #[test]
    fn compose_plain_motion_defaults_to_count_one() {
        let mut ctx = PendingContext::default();
        let cmd = compose_with_context(&mut ctx, &MappingOutput::Motion(Motion::Down));
        assert_eq!(
            cmd,
            Command::Move {
                motion: Motion::Down,
                count: 1
            }
        );
        assert!(ctx.count().is_none());
    }

    #[test]
    fn compose_count_then_motion() {
        let mut ctx = PendingContext::default();
        assert_eq!(
            compose_with_context(&mut ctx, &MappingOutput::CountDigit('1')),
            Command::Pending
        );
        assert_eq!(
            compose_with_context(&mut ctx, &MappingOutput::CountDigit('2')),
            Command::Pending
        );
        let cmd = compose_with_context(&mut ctx, &MappingOutput::Motion(Motion::Down));
        assert_eq!(
            cmd,
            Command::Move {
                motion: Motion::Down,
                count: 12
            }
        );
        assert!(ctx.count().is_none(), "count resets after dispatch");
    }

    #[test]
    fn compose_count_then_bottom_becomes_goto_line() {
        let mut ctx = PendingContext::default();
        compose_with_context(&mut ctx, &MappingOutput::CountDigit('4'));
        compose_with_context(&mut ctx, &MappingOutput::CountDigit('2'));
        let cmd = compose_with_context(&mut ctx, &MappingOutput::Motion(Motion::Bottom));
        assert_eq!(cmd, Command::GotoLine(42));
    }

    #[test]
    fn compose_bottom_without_count_goes_to_end() {
        let mut ctx = PendingContext::default();
        let cmd = compose_with_context(&mut ctx, &MappingOutput::Motion(Motion::Bottom));
        assert_eq!(cmd, Command::GotoBottom);
    }

    #[test]
    fn compose_toggle_resets_pending_count() {
        let mut ctx = PendingContext::default();
        compose_with_context(&mut ctx, &MappingOutput::CountDigit('5'));
        let cmd = compose_with_context(&mut ctx, &MappingOutput::ToggleHexMode);
        assert_eq!(cmd, Command::ToggleHexMode);
        assert!(ctx.count().is_none());
    }

    #[test]
    fn chooser_specs_build_without_panicking() {
        let _trie = MappingTrie::build(default_chooser_specs());
    }
}
