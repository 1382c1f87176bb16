//! Runtime UI inspection engine.
//!
//! Point at a rendered element and get back the source that produced it:
//! hover indicates the element with its `"tag in <Component>"` title and
//! source location, click fires an editor-launch request, and the context
//! menu opens a draggable panel listing every layer under the pointer with
//! its full render and source chains. Multiple renderer agents can register;
//! chains hand off between them when one tree is mounted inside another.
//!
//! The engine is headless: it owns geometry, event routing, resolution and
//! state, while indicators and panels are rendered by the embedding host
//! from the values computed here.

pub mod agent;
pub mod chain;
pub mod code_info;
pub mod dom;
pub mod editor;
pub mod gateway;
pub mod geometry;
pub mod inspector;
pub mod overlay;
pub mod panel;
pub mod resolve;
pub mod trace;
pub mod tracing_sub;
pub mod tree;

pub use agent::{AgentCallbacks, AgentElement, DomInspectAgent, InspectAgent, NameInfo};
pub use chain::{ChainKind, ElementsChain, InspectChain, InspectChainItem};
pub use code_info::CodeInfo;
pub use dom::{Document, DomEvent, ElementId, EventHub, EventKind};
pub use editor::{LaunchEditorParams, TrustedEditor};
pub use inspector::{Inspector, InspectorCallbacks, InspectorOptions};
pub use panel::InspectContextPanel;
pub use trace::{TRACE_SOURCE, Trace};
pub use tree::InstanceTree;
