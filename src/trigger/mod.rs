//! Trigger algebra.
//!
//! A `Trigger` is a composable boolean predicate over a `MessageDetail`.
//! Triggers are immutable and cheap to clone: a `Trigger` is a shared handle
//! to one node, so the same trigger can sit in several listeners and inside
//! several composites without being copied.
//!
//! `and`/`or` simplify eagerly using the two distinguished elements:
//!
//! - `NoMessages` is absorbing under `and` and the identity under `or`.
//! - `AllMessages` is absorbing under `or` and the identity under `and`.
//! - `a.and(&a)` and `a.or(&a)` return `a`, but only when both operands are
//!   the *same handle* (`Trigger::same`). Two separately built triggers with
//!   identical structure are never recognized as equal; they simply end up
//!   in a two-child composite.
//!
//! No flattening, De Morgan or distributive rewriting is performed: chaining
//! `and` builds a left-leaning tree of two-child conjunctions.

/// Serializable trigger descriptions.
pub mod spec;

use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::detail::MessageDetail;
use crate::error::RegistrationError;

pub use spec::TriggerSpec;

/// Signature of a caller-supplied predicate.
pub type PredicateFn = dyn Fn(&MessageDetail) -> bool + Send + Sync;

/// The closed set of trigger variants.
pub enum TriggerKind {
    /// Matches every message.
    AllMessages,
    /// Matches no message.
    NoMessages,
    /// Regex found anywhere in the full text.
    TextRegex(Regex),
    /// Named emote present.
    Emote(String),
    /// Regex matching at least one emote name.
    EmoteRegex(Regex),
    /// At least this many bits cheered.
    Bits(u64),
    /// User mentioned.
    Mention(String),
    /// Only emotes or cheers, no other visible text.
    EmoteOnly,
    /// Every child matches.
    Conjunction(Vec<Trigger>),
    /// Some child matches.
    Disjunction(Vec<Trigger>),
    /// Caller-supplied pure predicate.
    Predicate {
        /// Label used when displaying the trigger.
        name: String,
        /// The predicate itself.
        test: Box<PredicateFn>,
    },
}

impl fmt::Debug for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllMessages => f.write_str("AllMessages"),
            Self::NoMessages => f.write_str("NoMessages"),
            Self::TextRegex(re) => f.debug_tuple("TextRegex").field(&re.as_str()).finish(),
            Self::Emote(name) => f.debug_tuple("Emote").field(name).finish(),
            Self::EmoteRegex(re) => f.debug_tuple("EmoteRegex").field(&re.as_str()).finish(),
            Self::Bits(threshold) => f.debug_tuple("Bits").field(threshold).finish(),
            Self::Mention(user) => f.debug_tuple("Mention").field(user).finish(),
            Self::EmoteOnly => f.write_str("EmoteOnly"),
            Self::Conjunction(children) => f.debug_tuple("Conjunction").field(children).finish(),
            Self::Disjunction(children) => f.debug_tuple("Disjunction").field(children).finish(),
            Self::Predicate { name, .. } => f.debug_struct("Predicate").field("name", name).finish_non_exhaustive(),
        }
    }
}

/// Shared handle to an immutable trigger node.
#[derive(Clone)]
pub struct Trigger(Arc<TriggerKind>);

fn cached(cell: &'static OnceLock<Trigger>, kind: fn() -> TriggerKind) -> Trigger {
    cell.get_or_init(|| Trigger(Arc::new(kind()))).clone()
}

fn compile_regex(pattern: &str) -> Result<Regex, RegistrationError> {
    Regex::new(pattern).map_err(|e| RegistrationError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

impl Trigger {
    fn from_kind(kind: TriggerKind) -> Self {
        Self(Arc::new(kind))
    }

    /// The shared always-true trigger.
    #[must_use]
    pub fn all_messages() -> Self {
        static ALL: OnceLock<Trigger> = OnceLock::new();
        cached(&ALL, || TriggerKind::AllMessages)
    }

    /// The shared always-false trigger.
    #[must_use]
    pub fn no_messages() -> Self {
        static NONE: OnceLock<Trigger> = OnceLock::new();
        cached(&NONE, || TriggerKind::NoMessages)
    }

    /// Matches when `pattern` is found in the message text.
    pub fn text_regex(pattern: &str) -> Result<Self, RegistrationError> {
        Ok(Self::from_text_regex(compile_regex(pattern)?))
    }

    /// Like `text_regex`, from an already compiled regex.
    #[must_use]
    pub fn from_text_regex(regex: Regex) -> Self {
        Self::from_kind(TriggerKind::TextRegex(regex))
    }

    /// Matches when the message contains the emote `name`.
    #[must_use]
    pub fn emote(name: impl Into<String>) -> Self {
        Self::from_kind(TriggerKind::Emote(name.into()))
    }

    /// Matches when any emote name matches `pattern`.
    pub fn emote_regex(pattern: &str) -> Result<Self, RegistrationError> {
        Ok(Self::from_emote_regex(compile_regex(pattern)?))
    }

    /// Like `emote_regex`, from an already compiled regex.
    #[must_use]
    pub fn from_emote_regex(regex: Regex) -> Self {
        Self::from_kind(TriggerKind::EmoteRegex(regex))
    }

    /// Matches when at least `threshold` bits were cheered.
    #[must_use]
    pub fn bits(threshold: u64) -> Self {
        Self::from_kind(TriggerKind::Bits(threshold))
    }

    /// Matches when `user` (without `@`) is mentioned.
    #[must_use]
    pub fn mention(user: impl Into<String>) -> Self {
        Self::from_kind(TriggerKind::Mention(user.into()))
    }

    /// Matches messages made only of emotes and cheers.
    #[must_use]
    pub fn emote_only() -> Self {
        Self::from_kind(TriggerKind::EmoteOnly)
    }

    /// Wraps a caller-supplied predicate. It must be pure: it may be skipped
    /// by short-circuiting composites.
    #[must_use]
    pub fn predicate<F>(name: impl Into<String>, test: F) -> Self
    where
        F: Fn(&MessageDetail) -> bool + Send + Sync + 'static,
    {
        Self::from_kind(TriggerKind::Predicate {
            name: name.into(),
            test: Box::new(test),
        })
    }

    /// Builds one flat n-ary conjunction without simplification.
    pub fn conjunction(children: Vec<Trigger>) -> Result<Self, RegistrationError> {
        if children.len() < 2 {
            return Err(RegistrationError::TooFewChildren {
                kind: "Conjunction",
                actual: children.len(),
            });
        }
        Ok(Self::from_kind(TriggerKind::Conjunction(children)))
    }

    /// Builds one flat n-ary disjunction without simplification.
    pub fn disjunction(children: Vec<Trigger>) -> Result<Self, RegistrationError> {
        if children.len() < 2 {
            return Err(RegistrationError::TooFewChildren {
                kind: "Disjunction",
                actual: children.len(),
            });
        }
        Ok(Self::from_kind(TriggerKind::Disjunction(children)))
    }

    /// Folds `children` with `and`. An empty list yields `AllMessages`.
    #[must_use]
    pub fn all_of(children: impl IntoIterator<Item = Trigger>) -> Self {
        children
            .into_iter()
            .fold(Self::all_messages(), |acc, t| acc.and(&t))
    }

    /// Folds `children` with `or`. An empty list yields `NoMessages`.
    #[must_use]
    pub fn any_of(children: impl IntoIterator<Item = Trigger>) -> Self {
        children
            .into_iter()
            .fold(Self::no_messages(), |acc, t| acc.or(&t))
    }

    /// The underlying variant.
    #[must_use]
    pub fn kind(&self) -> &TriggerKind {
        &self.0
    }

    /// Pointer identity. Structurally equal triggers built separately are
    /// not the same.
    #[must_use]
    pub fn same(a: &Trigger, b: &Trigger) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// True for the `AllMessages` variant.
    #[must_use]
    pub fn is_all_messages(&self) -> bool {
        matches!(*self.0, TriggerKind::AllMessages)
    }

    /// True for the `NoMessages` variant.
    #[must_use]
    pub fn is_no_messages(&self) -> bool {
        matches!(*self.0, TriggerKind::NoMessages)
    }

    /// Conjunction with identity/absorbing simplification.
    #[must_use]
    pub fn and(&self, other: &Trigger) -> Trigger {
        if self.is_no_messages() || other.is_no_messages() {
            return Self::no_messages();
        }
        if self.is_all_messages() {
            return other.clone();
        }
        if other.is_all_messages() {
            return self.clone();
        }
        if Self::same(self, other) {
            return self.clone();
        }
        Self::from_kind(TriggerKind::Conjunction(vec![self.clone(), other.clone()]))
    }

    /// Disjunction with identity/absorbing simplification.
    #[must_use]
    pub fn or(&self, other: &Trigger) -> Trigger {
        if self.is_all_messages() || other.is_all_messages() {
            return Self::all_messages();
        }
        if self.is_no_messages() {
            return other.clone();
        }
        if other.is_no_messages() {
            return self.clone();
        }
        if Self::same(self, other) {
            return self.clone();
        }
        Self::from_kind(TriggerKind::Disjunction(vec![self.clone(), other.clone()]))
    }

    /// Evaluates the trigger. Composites short-circuit in child order.
    #[must_use]
    pub fn matches(&self, detail: &MessageDetail) -> bool {
        match &*self.0 {
            TriggerKind::AllMessages => true,
            TriggerKind::NoMessages => false,
            TriggerKind::TextRegex(re) => re.is_match(detail.text()),
            TriggerKind::Emote(name) => detail.emotes().iter().any(|e| e == name),
            TriggerKind::EmoteRegex(re) => detail.emotes().iter().any(|e| re.is_match(e)),
            TriggerKind::Bits(threshold) => detail.bits() >= *threshold,
            TriggerKind::Mention(user) => detail.mentions().iter().any(|m| m == user),
            TriggerKind::EmoteOnly => detail.is_emote_only(),
            TriggerKind::Conjunction(children) => children.iter().all(|c| c.matches(detail)),
            TriggerKind::Disjunction(children) => children.iter().any(|c| c.matches(detail)),
            TriggerKind::Predicate { test, .. } => test(detail),
        }
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Trigger], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (idx, child) in children.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            TriggerKind::AllMessages => f.write_str("all"),
            TriggerKind::NoMessages => f.write_str("none"),
            TriggerKind::TextRegex(re) => write!(f, "text~/{}/", re.as_str()),
            TriggerKind::Emote(name) => write!(f, "emote({name})"),
            TriggerKind::EmoteRegex(re) => write!(f, "emote~/{}/", re.as_str()),
            TriggerKind::Bits(threshold) => write!(f, "bits>={threshold}"),
            TriggerKind::Mention(user) => write!(f, "mention(@{user})"),
            TriggerKind::EmoteOnly => f.write_str("emote_only"),
            TriggerKind::Conjunction(children) => write_joined(f, children, " & "),
            TriggerKind::Disjunction(children) => write_joined(f, children, " | "),
            TriggerKind::Predicate { name, .. } => write!(f, "predicate({name})"),
        }
    }
}

impl BitAnd for Trigger {
    type Output = Trigger;

    fn bitand(self, rhs: Trigger) -> Trigger {
        self.and(&rhs)
    }
}

impl BitAnd for &Trigger {
    type Output = Trigger;

    fn bitand(self, rhs: &Trigger) -> Trigger {
        self.and(rhs)
    }
}

impl BitOr for Trigger {
    type Output = Trigger;

    fn bitor(self, rhs: Trigger) -> Trigger {
        self.or(&rhs)
    }
}

impl BitOr for &Trigger {
    type Output = Trigger;

    fn bitor(self, rhs: &Trigger) -> Trigger {
        self.or(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn detail(text: &str, without: &str, emotes: &[&str], mentions: &[&str], bits: u64) -> MessageDetail {
        MessageDetail::new(
            text,
            without,
            emotes.iter().map(ToString::to_string).collect(),
            mentions.iter().map(ToString::to_string).collect(),
            bits,
        )
    }

    fn counting(name: &str, result: bool) -> (Trigger, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let trigger = Trigger::predicate(name, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            result
        });
        (trigger, calls)
    }

    fn samples() -> Vec<Trigger> {
        vec![
            Trigger::all_messages(),
            Trigger::no_messages(),
            Trigger::text_regex("^hi").unwrap(),
            Trigger::emote("Kappa"),
            Trigger::bits(100),
            Trigger::mention("bob"),
            Trigger::emote_only(),
            Trigger::emote("Kappa").and(&Trigger::mention("bob")),
        ]
    }

    #[test]
    fn identity_laws_return_the_same_handle() {
        for a in samples() {
            assert!(Trigger::same(&a.and(&Trigger::all_messages()), &a), "{a} and all");
            assert!(Trigger::same(&Trigger::all_messages().and(&a), &a), "all and {a}");
            assert!(Trigger::same(&a.or(&Trigger::no_messages()), &a), "{a} or none");
            assert!(Trigger::same(&Trigger::no_messages().or(&a), &a), "none or {a}");
        }
    }

    #[test]
    fn absorbing_laws() {
        let details = [
            detail("", "", &[], &[], 0),
            detail("hi @bob Kappa", "hi @bob ", &["Kappa"], &["bob"], 500),
        ];
        for a in samples() {
            let never = a.and(&Trigger::no_messages());
            let always = a.or(&Trigger::all_messages());
            assert!(never.is_no_messages());
            assert!(always.is_all_messages());
            for d in &details {
                assert!(!never.matches(d));
                assert!(always.matches(d));
            }
        }
    }

    #[test]
    fn no_messages_wins_over_all_messages_under_and() {
        let t = Trigger::all_messages().and(&Trigger::no_messages());
        assert!(t.is_no_messages());
        let t = Trigger::no_messages().or(&Trigger::all_messages());
        assert!(t.is_all_messages());
    }

    #[test]
    fn idempotence_uses_reference_identity() {
        let a = Trigger::emote("Kappa");
        assert!(Trigger::same(&a.and(&a), &a));
        assert!(Trigger::same(&a.or(&a), &a));

        let twin = Trigger::emote("Kappa");
        let both = a.and(&twin);
        assert!(!Trigger::same(&both, &a));
        match both.kind() {
            TriggerKind::Conjunction(children) => {
                assert_eq!(children.len(), 2);
                assert!(Trigger::same(&children[0], &a));
                assert!(Trigger::same(&children[1], &twin));
            }
            other => panic!("expected conjunction, got {other:?}"),
        }
    }

    #[test]
    fn chained_and_builds_left_leaning_pairs() {
        let a = Trigger::emote("A");
        let b = Trigger::emote("B");
        let c = Trigger::emote("C");
        let t = a.and(&b).and(&c);
        let TriggerKind::Conjunction(outer) = t.kind() else {
            panic!("expected conjunction");
        };
        assert_eq!(outer.len(), 2);
        assert!(matches!(outer[0].kind(), TriggerKind::Conjunction(inner) if inner.len() == 2));
        assert!(Trigger::same(&outer[1], &c));
        assert_eq!(t.to_string(), "((emote(A) & emote(B)) & emote(C))");
    }

    #[test]
    fn conjunction_short_circuits_on_first_false() {
        let (decider, decider_calls) = counting("decider", false);
        let (later, later_calls) = counting("later", true);
        let t = decider.and(&later);
        assert!(!t.matches(&MessageDetail::default()));
        assert_eq!(decider_calls.load(Ordering::SeqCst), 1);
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn disjunction_short_circuits_on_first_true() {
        let (decider, decider_calls) = counting("decider", true);
        let (later, later_calls) = counting("later", false);
        let t = decider | later;
        assert!(t.matches(&MessageDetail::default()));
        assert_eq!(decider_calls.load(Ordering::SeqCst), 1);
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn composites_evaluate_all_children_when_undecided() {
        let (first, first_calls) = counting("first", true);
        let (second, second_calls) = counting("second", true);
        assert!((&first & &second).matches(&MessageDetail::default()));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn emote_only_cases() {
        let t = Trigger::emote_only();
        assert!(t.matches(&detail("Kappa", "   ", &["Kappa"], &[], 0)));
        assert!(!t.matches(&detail("", "", &[], &[], 0)));
        assert!(t.matches(&detail("Cheer5", "", &[], &[], 5)));
        assert!(!t.matches(&detail("hi Kappa", "hi ", &["Kappa"], &[], 0)));
    }

    #[test]
    fn leaf_variants() {
        let d = detail("hi @bob Kappa", "hi @bob ", &["Kappa", "PogChamp"], &["bob"], 250);

        assert!(Trigger::text_regex(r"^hi\b").unwrap().matches(&d));
        assert!(!Trigger::text_regex("^bye").unwrap().matches(&d));
        assert!(Trigger::emote("PogChamp").matches(&d));
        assert!(!Trigger::emote("Pog").matches(&d));
        assert!(Trigger::emote_regex("^Pog").unwrap().matches(&d));
        assert!(!Trigger::emote_regex("^Lul").unwrap().matches(&d));
        assert!(Trigger::bits(250).matches(&d));
        assert!(!Trigger::bits(251).matches(&d));
        assert!(Trigger::bits(0).matches(&MessageDetail::default()));
        assert!(Trigger::mention("bob").matches(&d));
        assert!(!Trigger::mention("@bob").matches(&d));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let err = Trigger::text_regex("(unclosed").unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
        assert!(Trigger::emote_regex("[").is_err());
    }

    #[test]
    fn nary_constructors_require_two_children() {
        let err = Trigger::conjunction(vec![Trigger::emote("A")]).unwrap_err();
        assert_eq!(err, RegistrationError::TooFewChildren { kind: "Conjunction", actual: 1 });
        assert!(Trigger::disjunction(Vec::new()).is_err());

        let flat = Trigger::disjunction(vec![Trigger::emote("A"), Trigger::emote("B"), Trigger::emote("C")]).unwrap();
        assert_eq!(flat.to_string(), "(emote(A) | emote(B) | emote(C))");
        assert!(flat.matches(&detail("C", "", &["C"], &[], 0)));
    }

    #[test]
    fn folding_constructors() {
        assert!(Trigger::all_of(Vec::new()).is_all_messages());
        assert!(Trigger::any_of(Vec::new()).is_no_messages());

        let a = Trigger::emote("A");
        assert!(Trigger::same(&Trigger::all_of(vec![a.clone()]), &a));
        assert!(Trigger::any_of(vec![a.clone(), Trigger::all_messages()]).is_all_messages());
        assert!(Trigger::all_of(vec![a, Trigger::no_messages()]).is_no_messages());
    }

    #[test]
    fn cached_elements_are_shared() {
        assert!(Trigger::same(&Trigger::no_messages(), &Trigger::no_messages()));
        assert!(Trigger::same(&Trigger::all_messages(), &Trigger::all_messages()));
        let t = Trigger::emote("A").and(&Trigger::no_messages());
        assert!(Trigger::same(&t, &Trigger::no_messages()));
    }
}
