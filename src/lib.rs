//! Axis conversion for imported 3D assets.
//!
//! Rewrites Z-up right-handed scene content (node hierarchy, mesh buffers,
//! skin bind poses and transform curves) into a Y-up left-handed convention,
//! with an optional extra flip of the front axis.

pub mod animation;
pub mod correction;
pub mod document;
pub mod error;
pub mod geometry;
pub mod hierarchy;
pub mod logging;
pub mod mesh;
pub mod pipeline;
pub mod policy;
pub mod scene;
pub mod settings;
pub mod skinning;
pub mod types;
pub mod user_data;

pub use animation::{AnimationClip, remap_clip};
pub use error::ConvertError;
pub use geometry::{ImportOptions, remap_scene_meshes};
pub use hierarchy::{DeltaMap, remap_hierarchy};
pub use logging::{LogLevel, ResultExt, send_log};
pub use pipeline::AxisConversionPostprocessor;
pub use policy::AxisConventionPolicy;
pub use scene::{MeshId, NodeId, Scene};
pub use settings::AxisConversionSettings;
pub use skinning::remap_bind_poses;
pub use types::{ClipConversionReport, SceneConversionReport, Severity, ValidationIssue};
pub use user_data::AssetUserData;
