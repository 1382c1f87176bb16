//! Inspection chains: the upward walk from a hit element to its render root,
//! composable across agents.
//!
//! A single agent produces links until its own root; when that root is
//! mounted inside some outer renderer, the agent ends with a continuation
//! element instead of plain exhaustion. [`ElementsChain`] stitches those
//! hand-offs together by asking every registered agent to claim the
//! continuation.

use std::rc::Rc;

use crate::agent::{AgentElement, InspectAgent};
use crate::code_info::CodeInfo;

/// Badge shown next to a chain item: an id/class marker or a kind label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagItem {
    pub label: String,
    pub background: Option<String>,
}

impl TagItem {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            background: None,
        }
    }

    pub fn badge(label: impl Into<String>, background: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            background: Some(background.into()),
        }
    }
}

/// One link of an inspection chain.
#[derive(Clone)]
pub struct InspectChainItem {
    pub agent: Rc<dyn InspectAgent>,
    /// Element to highlight when the item is hovered in a list; links
    /// without an own element inherit the nearest one below them.
    pub element: Option<AgentElement>,
    pub title: String,
    pub subtitle: Option<String>,
    pub tags: Vec<TagItem>,
    pub code_info: Option<CodeInfo>,
}

impl std::fmt::Debug for InspectChainItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InspectChainItem")
            .field("title", &self.title)
            .field("subtitle", &self.subtitle)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Step result of a single agent's chain. `Done(Some(_))` is a terminal
/// continuation: the element the agent's root is mounted into, owned by some
/// other agent. `Done(None)` is plain exhaustion.
pub enum ChainNext {
    Item(InspectChainItem),
    Done(Option<AgentElement>),
}

/// A single agent's upward walk.
pub trait InspectChain {
    fn next_link(&mut self) -> ChainNext;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    /// Runtime structure order.
    Render,
    /// Source-code structure order.
    Source,
}

/// Upper bound on agent hand-offs in one composed chain. Mutually embedded
/// renderers would otherwise loop forever.
pub const MAX_AGENT_HOPS: usize = 8;

/// Composed chain across all registered agents.
pub struct ElementsChain {
    agents: Vec<Rc<dyn InspectAgent>>,
    kind: ChainKind,
    current: Option<Box<dyn InspectChain>>,
    hops: usize,
}

impl ElementsChain {
    pub fn new(
        agents: Vec<Rc<dyn InspectAgent>>,
        agent: &Rc<dyn InspectAgent>,
        element: AgentElement,
        kind: ChainKind,
    ) -> Self {
        let current = start_chain(agent, element, kind);
        Self {
            agents,
            kind,
            current: Some(current),
            hops: 0,
        }
    }

    fn hand_off(&mut self, element: AgentElement) -> Option<Box<dyn InspectChain>> {
        if self.hops >= MAX_AGENT_HOPS {
            tracing::warn!(
                hops = self.hops,
                "agent hand-off limit reached, ending chain"
            );
            return None;
        }
        self.hops += 1;
        let agent = self
            .agents
            .iter()
            .find(|agent| agent.is_agent_element(&element))?;
        Some(start_chain(agent, element, self.kind))
    }
}

fn start_chain(
    agent: &Rc<dyn InspectAgent>,
    element: AgentElement,
    kind: ChainKind,
) -> Box<dyn InspectChain> {
    match kind {
        ChainKind::Render => agent.render_chain(element),
        ChainKind::Source => agent.source_chain(element),
    }
}

impl Iterator for ElementsChain {
    type Item = InspectChainItem;

    fn next(&mut self) -> Option<InspectChainItem> {
        loop {
            let current = self.current.as_mut()?;
            match current.next_link() {
                ChainNext::Item(item) => return Some(item),
                ChainNext::Done(None) => {
                    self.current = None;
                    return None;
                }
                ChainNext::Done(Some(element)) => {
                    self.current = self.hand_off(element);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentCallbacks, IndicateParams, NameInfo};
    use crate::geometry::Pointer;
    use std::any::Any;

    /// Yields a fixed set of titles, then hands off a marker value.
    struct ScriptedChain {
        agent: Rc<dyn InspectAgent>,
        titles: Vec<&'static str>,
        continuation: Option<AgentElement>,
    }

    impl InspectChain for ScriptedChain {
        fn next_link(&mut self) -> ChainNext {
            if self.titles.is_empty() {
                return ChainNext::Done(self.continuation.take());
            }
            let title = self.titles.remove(0);
            ChainNext::Item(InspectChainItem {
                agent: Rc::clone(&self.agent),
                element: None,
                title: title.to_owned(),
                subtitle: None,
                tags: Vec::new(),
                code_info: None,
            })
        }
    }

    /// Claims `u32` markers of its own parity; chains yield one titled link
    /// then hand off the next marker, so composition ping-pongs between the
    /// two test agents.
    struct MarkerAgent {
        name: &'static str,
        parity: u32,
        weak: std::rc::Weak<MarkerAgent>,
        endless: bool,
    }

    impl MarkerAgent {
        fn new(name: &'static str, parity: u32, endless: bool) -> Rc<Self> {
            Rc::new_cyclic(|weak| Self {
                name,
                parity,
                weak: weak.clone(),
                endless,
            })
        }
    }

    impl InspectAgent for MarkerAgent {
        fn activate(&self, _callbacks: AgentCallbacks) {}
        fn deactivate(&self) {}

        fn is_agent_element(&self, element: &AgentElement) -> bool {
            element
                .downcast_ref::<u32>()
                .is_some_and(|marker| marker % 2 == self.parity)
        }

        fn top_element_from_pointer(&self, _pointer: Pointer) -> Option<AgentElement> {
            None
        }

        fn top_elements_from_pointer(&self, _pointer: Pointer) -> Vec<AgentElement> {
            Vec::new()
        }

        fn render_chain(&self, element: AgentElement) -> Box<dyn InspectChain> {
            let marker = element.downcast_ref::<u32>().copied().unwrap_or(0);
            let agent: Rc<dyn InspectAgent> = match self.weak.upgrade() {
                Some(agent) => agent,
                None => unreachable!("agent owns the chain"),
            };
            let continuation: Option<AgentElement> = if self.endless || marker < 3 {
                Some(Rc::new(marker + 1) as Rc<dyn Any>)
            } else {
                None
            };
            Box::new(ScriptedChain {
                agent,
                titles: vec![self.name],
                continuation,
            })
        }

        fn source_chain(&self, element: AgentElement) -> Box<dyn InspectChain> {
            self.render_chain(element)
        }

        fn name_info(&self, _element: &AgentElement) -> Option<NameInfo> {
            None
        }

        fn find_code_info(&self, _element: &AgentElement) -> Option<CodeInfo> {
            None
        }

        fn indicate(&self, _params: IndicateParams) {}
        fn remove_indicate(&self) {}
    }

    #[test]
    fn chain_hands_off_between_agents() {
        let even = MarkerAgent::new("even", 0, false);
        let odd = MarkerAgent::new("odd", 1, false);
        let agents: Vec<Rc<dyn InspectAgent>> = vec![even.clone(), odd.clone()];

        let start: Rc<dyn InspectAgent> = even;
        let chain = ElementsChain::new(
            agents,
            &start,
            Rc::new(0u32) as Rc<dyn Any>,
            ChainKind::Render,
        );
        let titles: Vec<String> = chain.map(|item| item.title).collect();
        assert_eq!(titles, vec!["even", "odd", "even", "odd"]);
    }

    #[test]
    fn unclaimed_continuation_ends_chain() {
        let even = MarkerAgent::new("even", 0, false);
        let agents: Vec<Rc<dyn InspectAgent>> = vec![even.clone()];

        let start: Rc<dyn InspectAgent> = even;
        let chain = ElementsChain::new(
            agents,
            &start,
            Rc::new(0u32) as Rc<dyn Any>,
            ChainKind::Render,
        );
        // continuation 1 is odd: nobody claims it
        assert_eq!(chain.count(), 1);
    }

    #[test]
    fn hop_guard_bounds_mutual_embedding() {
        let even = MarkerAgent::new("even", 0, true);
        let odd = MarkerAgent::new("odd", 1, true);
        let agents: Vec<Rc<dyn InspectAgent>> = vec![even.clone(), odd.clone()];

        let start: Rc<dyn InspectAgent> = even;
        let chain = ElementsChain::new(
            agents,
            &start,
            Rc::new(0u32) as Rc<dyn Any>,
            ChainKind::Render,
        );
        assert_eq!(chain.count(), MAX_AGENT_HOPS + 1);
    }
}
