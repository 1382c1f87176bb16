//! Renderer agents.
//!
//! The engine itself is renderer-agnostic; everything that touches a
//! concrete rendering tree goes through [`InspectAgent`]. Agent elements are
//! type-erased handles so chains can carry elements of foreign renderers
//! through a hand-off without the engine knowing their type.

mod dom_agent;
mod element_tags;

use std::any::Any;
use std::rc::Rc;

pub use dom_agent::{DomInspectAgent, dom_element};
pub use element_tags::{TAG_BACKGROUND, element_tags};

use crate::chain::InspectChain;
use crate::code_info::CodeInfo;
use crate::geometry::Pointer;

/// Type-erased element handle; each agent downcasts to its own element type
/// in [`InspectAgent::is_agent_element`].
pub type AgentElement = Rc<dyn Any>;

/// Interaction callbacks handed to an agent on activation. The agent only
/// reports; deciding what a click means stays with the caller, which returns
/// `true` from down/click when the event must not reach the page.
pub struct AgentCallbacks {
    pub on_hover: Box<dyn FnMut(AgentElement, Pointer)>,
    pub on_pointer_down: Box<dyn FnMut(Option<AgentElement>, Pointer) -> bool>,
    pub on_click: Box<dyn FnMut(Option<AgentElement>, Pointer) -> bool>,
}

/// Name and short description of an element for indicator UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameInfo {
    pub name: String,
    pub title: String,
}

/// Parameters for [`InspectAgent::indicate`]. A missing `code_info` asks the
/// agent to resolve one itself.
pub struct IndicateParams {
    pub element: AgentElement,
    pub code_info: Option<CodeInfo>,
    pub pointer: Option<Pointer>,
    pub name: Option<String>,
    pub title: Option<String>,
}

/// One renderer binding. Object-safe so heterogeneous agents can share a
/// registry.
pub trait InspectAgent {
    /// Begin listening for interaction, reporting through `callbacks`.
    /// Re-activation implies deactivation first.
    fn activate(&self, callbacks: AgentCallbacks);

    /// Remove listeners and indicators, release state. Idempotent.
    fn deactivate(&self);

    /// Whether `element` belongs to this agent's render tree. Continuations
    /// produced by other agents' chains are claimed through this.
    fn is_agent_element(&self, element: &AgentElement) -> bool;

    /// Topmost element under the pointer, used to seed hover state when
    /// inspection starts mid-hover.
    fn top_element_from_pointer(&self, pointer: Pointer) -> Option<AgentElement>;

    /// One element per visual layer under the pointer, topmost first.
    /// Unlike plain hit testing this skips elements that are merely
    /// ancestors of a higher hit.
    fn top_elements_from_pointer(&self, pointer: Pointer) -> Vec<AgentElement>;

    /// Upward walk in runtime structure order.
    fn render_chain(&self, element: AgentElement) -> Box<dyn InspectChain>;

    /// Upward walk in source-code structure order; only links worth showing
    /// are yielded.
    fn source_chain(&self, element: AgentElement) -> Box<dyn InspectChain>;

    fn name_info(&self, element: &AgentElement) -> Option<NameInfo>;

    fn find_code_info(&self, element: &AgentElement) -> Option<CodeInfo>;

    /// Show the agent's indicator on `element`.
    fn indicate(&self, params: IndicateParams);

    /// Hide the agent's indicator. Idempotent.
    fn remove_indicate(&self);
}
