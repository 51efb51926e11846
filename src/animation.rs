use std::collections::BTreeMap;
use std::fmt;

use nalgebra::{Quaternion, Vector4};
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::logging::ResultExt;
use crate::policy::AxisConventionPolicy;
use crate::{log_debug, log_warn};

// ─── Clip data ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    #[serde(default)]
    pub in_tangent: f32,
    #[serde(default)]
    pub out_tangent: f32,
}

impl Keyframe {
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: 0.0,
            out_tangent: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationCurve {
    pub keys: Vec<Keyframe>,
}

/// Component a curve binding animates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingTarget {
    Transform,
    /// Any other component type, by name. Never touched by the conversion.
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurveBinding {
    /// Slash-separated node path relative to the animated root.
    pub path: String,
    pub target: BindingTarget,
    /// Property name, e.g. `rotation.w`.
    pub property: String,
    pub curve: AnimationCurve,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub bindings: Vec<CurveBinding>,
}

// ─── Channels ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKind {
    Position,
    Rotation,
    Scale,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Position => "position",
            ChannelKind::Rotation => "rotation",
            ChannelKind::Scale => "scale",
        }
    }

    /// Component letters this channel is made of, in storage order.
    pub fn components(&self) -> &'static [char] {
        match self {
            ChannelKind::Rotation => &['x', 'y', 'z', 'w'],
            ChannelKind::Position | ChannelKind::Scale => &['x', 'y', 'z'],
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split a transform property name such as `position.x` into its channel and
/// component. Returns `None` for anything outside the ten known names.
pub fn parse_channel(property: &str) -> Option<(ChannelKind, char)> {
    let (channel, component) = property.split_once('.')?;
    let channel = match channel {
        "position" => ChannelKind::Position,
        "rotation" => ChannelKind::Rotation,
        "scale" => ChannelKind::Scale,
        _ => return None,
    };

    let mut chars = component.chars();
    let component = chars.next()?;
    if chars.next().is_some() || !channel.components().contains(&component) {
        return None;
    }
    Some((channel, component))
}

fn property_name(channel: ChannelKind, component: char) -> String {
    format!("{}.{}", channel, component)
}

/// Outcome of remapping one clip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipRemap {
    pub remapped_groups: usize,
    pub rejected_groups: usize,
    /// `(path, property)` of transform bindings that were skipped.
    pub unrecognized: Vec<(String, String)>,
    /// Groups handled without lock-step access whose curves still disagree
    /// on keyframe count.
    pub uneven_groups: Vec<UnevenGroup>,
    pub errors: Vec<ConvertError>,
}

/// Channel group whose component curves have different keyframe counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnevenGroup {
    pub path: String,
    pub channel: ChannelKind,
    /// Keyframe count per present component, in component order.
    pub counts: Vec<usize>,
}

type ChannelGroups = BTreeMap<(String, ChannelKind), BTreeMap<char, usize>>;

fn group_bindings(clip: &AnimationClip, unrecognized: &mut Vec<(String, String)>) -> ChannelGroups {
    let mut groups = ChannelGroups::new();

    for (index, binding) in clip.bindings.iter().enumerate() {
        if binding.target != BindingTarget::Transform {
            continue;
        }

        let Some((channel, component)) = parse_channel(&binding.property) else {
            log_warn!(
                "clip '{}': skipping unrecognized transform property '{}' on '{}'",
                clip.name,
                binding.property,
                binding.path
            );
            unrecognized.push((binding.path.clone(), binding.property.clone()));
            continue;
        };

        let components = groups.entry((binding.path.clone(), channel)).or_default();
        if components.contains_key(&component) {
            log_warn!(
                "clip '{}': duplicate '{}' curve on '{}' ignored",
                clip.name,
                binding.property,
                binding.path
            );
            unrecognized.push((binding.path.clone(), binding.property.clone()));
            continue;
        }
        components.insert(component, index);
    }

    groups
}

// ─── Clip pass ────────────────────────────────────────────────────────────────

/// Remap every transform channel group of `clip` into the target convention.
///
/// Groups are validated before anything is written; a rejected group is left
/// exactly as it was and the remaining groups still run.
pub fn remap_clip(clip: &mut AnimationClip, policy: &AxisConventionPolicy) -> ClipRemap {
    log_debug!("Fixing animation: {}", clip.name);

    let mut outcome = ClipRemap::default();
    let groups = group_bindings(clip, &mut outcome.unrecognized);
    let context = format!("clip '{}'", clip.name);

    for ((path, channel), components) in &groups {
        let lockstep = match channel {
            ChannelKind::Position => policy.flip_z_axis(),
            ChannelKind::Rotation => true,
            ChannelKind::Scale => false,
        };
        if !lockstep {
            let counts: Vec<usize> = components
                .values()
                .map(|&slot| clip.bindings[slot].curve.keys.len())
                .collect();
            if counts.windows(2).any(|pair| pair[0] != pair[1]) {
                log_warn!(
                    "{}: {} curves on '{}' have uneven keyframe counts {:?}",
                    context,
                    channel,
                    path,
                    counts
                );
                outcome.uneven_groups.push(UnevenGroup {
                    path: path.clone(),
                    channel: *channel,
                    counts,
                });
            }
        }

        let result = match channel {
            ChannelKind::Position => remap_position(clip, path, components, policy),
            ChannelKind::Rotation => remap_rotation(clip, path, components, policy),
            ChannelKind::Scale => Ok(swap_scale_curves(clip, components)),
        }
        .log_error(Some(&context));

        match result {
            Ok(true) => outcome.remapped_groups += 1,
            Ok(false) => {}
            Err(error) => {
                outcome.rejected_groups += 1;
                outcome.errors.push(error);
            }
        }
    }

    outcome
}

fn remap_position(
    clip: &mut AnimationClip,
    path: &str,
    components: &BTreeMap<char, usize>,
    policy: &AxisConventionPolicy,
) -> Result<bool, ConvertError> {
    if !policy.flip_z_axis() {
        return Ok(false);
    }

    let slots = lockstep_slots(clip, path, ChannelKind::Position, components, ['x', 'y', 'z'])?;
    let mask = policy.position_mask();
    remap_lockstep(clip, slots, |[x, y, z]| [x * mask.x, y * mask.y, z * mask.z]);
    Ok(true)
}

fn remap_rotation(
    clip: &mut AnimationClip,
    path: &str,
    components: &BTreeMap<char, usize>,
    policy: &AxisConventionPolicy,
) -> Result<bool, ConvertError> {
    let slots = lockstep_slots(
        clip,
        path,
        ChannelKind::Rotation,
        components,
        ['x', 'y', 'z', 'w'],
    )?;

    let fix = policy.animation_rotation_fix();
    let mirror = policy.animation_mirror();
    remap_lockstep(clip, slots, |xyzw| {
        let q = Quaternion::from_vector(Vector4::from(xyzw));
        remap_rotation_key(q, fix, mirror).coords.into()
    });
    Ok(true)
}

/// `q * fix`, wrapped as `mirror * (q * fix) * mirror` when a mirror is given.
///
/// Linear in `q`, so it applies equally to values and tangent 4-vectors.
pub fn remap_rotation_key(
    q: Quaternion<f32>,
    fix: Quaternion<f32>,
    mirror: Option<Quaternion<f32>>,
) -> Quaternion<f32> {
    let fixed = q * fix;
    match mirror {
        Some(m) => m * fixed * m,
        None => fixed,
    }
}

/// Swap the Y and Z scale curves. A lone Y or Z curve is relabelled instead.
fn swap_scale_curves(clip: &mut AnimationClip, components: &BTreeMap<char, usize>) -> bool {
    match (components.get(&'y').copied(), components.get(&'z').copied()) {
        (Some(y), Some(z)) => {
            let y_curve = std::mem::take(&mut clip.bindings[y].curve);
            let z_curve = std::mem::replace(&mut clip.bindings[z].curve, y_curve);
            clip.bindings[y].curve = z_curve;
        }
        (Some(y), None) => clip.bindings[y].property = property_name(ChannelKind::Scale, 'z'),
        (None, Some(z)) => clip.bindings[z].property = property_name(ChannelKind::Scale, 'y'),
        (None, None) => return false,
    }
    true
}

/// Binding indices of `names` within one group, checked for presence and
/// equal keyframe counts.
fn lockstep_slots<const N: usize>(
    clip: &AnimationClip,
    path: &str,
    channel: ChannelKind,
    components: &BTreeMap<char, usize>,
    names: [char; N],
) -> Result<[usize; N], ConvertError> {
    let mut slots = [0usize; N];
    for (slot, name) in slots.iter_mut().zip(names) {
        *slot = *components
            .get(&name)
            .ok_or_else(|| ConvertError::MissingComponentCurve {
                path: path.to_string(),
                channel,
                component: name,
            })?;
    }

    let counts: Vec<usize> = slots
        .iter()
        .map(|&slot| clip.bindings[slot].curve.keys.len())
        .collect();
    if counts.iter().any(|&count| count != counts[0]) {
        return Err(ConvertError::MismatchedKeyframeCounts {
            path: path.to_string(),
            channel,
            counts,
        });
    }

    Ok(slots)
}

/// Rewrite keyframes of already-validated curves index by index.
///
/// `map` is applied to values, in-tangents and out-tangents alike; times
/// are taken from the first curve.
fn remap_lockstep<const N: usize>(
    clip: &mut AnimationClip,
    slots: [usize; N],
    map: impl Fn([f32; N]) -> [f32; N],
) {
    let count = clip.bindings[slots[0]].curve.keys.len();

    for index in 0..count {
        let keys = slots.map(|slot| clip.bindings[slot].curve.keys[index]);
        let time = keys[0].time;
        let values = map(keys.map(|key| key.value));
        let in_tangents = map(keys.map(|key| key.in_tangent));
        let out_tangents = map(keys.map(|key| key.out_tangent));

        for (n, slot) in slots.iter().enumerate() {
            clip.bindings[*slot].curve.keys[index] = Keyframe {
                time,
                value: values[n],
                in_tangent: in_tangents[n],
                out_tangent: out_tangents[n],
            };
        }
    }
}
