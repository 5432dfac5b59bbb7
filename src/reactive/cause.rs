//! Causal chains for change events.
//!
//! Every change travelling through the reactive graph carries a [`Cause`]:
//! a unique event identity plus a link to the event that provoked it. Walking
//! the chain answers "what caused this change".

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

thread_local! {
    static NEXT_EVENT: Cell<u64> = const { Cell::new(1) };
}

fn next_event_id() -> EventId {
    NEXT_EVENT.with(|next| {
        let id = next.get();
        next.set(id + 1);
        EventId(id)
    })
}

/// Identifies a single event. Unique within the thread that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u64);

impl EventId {
    /// The raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

struct CauseNode {
    id: EventId,
    description: String,
    parent: Option<Cause>,
}

/// A link in a causal chain. Cheap to clone (reference counted).
#[derive(Clone)]
pub struct Cause {
    node: Rc<CauseNode>,
}

impl Cause {
    /// Start a new chain with no parent.
    pub fn root(description: impl Into<String>) -> Self {
        Self {
            node: Rc::new(CauseNode {
                id: next_event_id(),
                description: description.into(),
                parent: None,
            }),
        }
    }

    /// Create a new event caused by `self`.
    pub fn derive(&self, description: impl Into<String>) -> Self {
        Self {
            node: Rc::new(CauseNode {
                id: next_event_id(),
                description: description.into(),
                parent: Some(self.clone()),
            }),
        }
    }

    pub fn id(&self) -> EventId {
        self.node.id
    }

    pub fn description(&self) -> &str {
        &self.node.description
    }

    /// The event that provoked this one, if any.
    pub fn parent(&self) -> Option<&Cause> {
        self.node.parent.as_ref()
    }

    /// Iterate from this event up to the root of its chain.
    pub fn chain(&self) -> CauseChain<'_> {
        CauseChain {
            current: Some(self),
        }
    }

    /// The originating event of this chain.
    pub fn root_cause(&self) -> &Cause {
        let mut current = self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Whether `other` appears anywhere in this event's chain (including
    /// this event itself).
    pub fn is_caused_by(&self, other: &Cause) -> bool {
        self.chain().any(|c| c.id() == other.id())
    }

    /// Number of links above this event.
    pub fn depth(&self) -> usize {
        self.chain().count() - 1
    }
}

impl PartialEq for Cause {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Cause {}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.chain().map(|c| (c.id().get(), c.description())))
            .finish()
    }
}

/// Iterator over a causal chain, innermost event first.
pub struct CauseChain<'a> {
    current: Option<&'a Cause>,
}

impl<'a> Iterator for CauseChain<'a> {
    type Item = &'a Cause;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = current.parent();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_no_parent() {
        let c = Cause::root("click");
        assert!(c.parent().is_none());
        assert_eq!(c.depth(), 0);
        assert_eq!(c.root_cause(), &c);
    }

    #[test]
    fn ids_are_unique() {
        let a = Cause::root("a");
        let b = Cause::root("b");
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn derived_chain() {
        let root = Cause::root("state pressed activated");
        let style = root.derive("corner_radius restyled");
        let expr = style.derive("expression recomputed");

        let descriptions: Vec<&str> = expr.chain().map(Cause::description).collect();
        assert_eq!(
            descriptions,
            vec![
                "expression recomputed",
                "corner_radius restyled",
                "state pressed activated"
            ]
        );
        assert_eq!(expr.depth(), 2);
        assert_eq!(expr.root_cause(), &root);
        assert!(expr.is_caused_by(&root));
        assert!(expr.is_caused_by(&style));
        assert!(!root.is_caused_by(&expr));
    }

    #[test]
    fn debug_lists_chain() {
        let c = Cause::root("outer").derive("inner");
        let dbg = format!("{c:?}");
        assert!(dbg.contains("inner"));
        assert!(dbg.contains("outer"));
    }
}
