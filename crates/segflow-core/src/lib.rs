//! Segflow Core Library
//!
//! Segmentation state, layered display configuration and interactive
//! labelmap editing tools for medical image viewers. Rendering and image
//! loading belong to the host; the core talks to them through the
//! [`View`], [`VolumeCache`], [`VolumeLoader`] and [`RenderSink`] traits.

pub mod camera;
pub mod config;
pub mod error;
pub mod events;
pub mod input;
pub mod interaction;
pub mod render_bus;
pub mod session;
pub mod state;
pub mod tools;
pub mod viewport;
pub mod volume;

pub use camera::{Camera, CanvasTransform};
pub use config::{ResolvedConfig, SegmentationRepresentationConfig};
pub use error::{ErrorKind, Result, SegmentationError};
pub use events::{ChangeKind, EventNotifier, StateChange, Subscription};
pub use input::{EventPoints, KeyEvent, MouseButton, PointerEvent};
pub use interaction::{CommitOutcome, DrawingSink, ExclusionScope, InteractionStateMachine};
pub use render_bus::{RenderSink, RenderTriggerBus};
pub use session::{PointerOutcome, SegmentationSession};
pub use state::{
    ColorLut, RepresentationInput, RepresentationType, Rgba, SegmentationInput,
    SegmentationStateStore,
};
pub use tools::{CircleScissorsTool, RectangleScissorsTool, Tool, ToolConfiguration};
pub use viewport::{OrthographicView, View, VolumeInput};
pub use volume::{ImageVolume, InMemoryVolumeCache, InMemoryVolumeLoader, VolumeCache, VolumeLoader};
