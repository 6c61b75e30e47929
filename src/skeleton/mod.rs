//! Skeletal animation: a joint hierarchy with keyframed TRS tracks,
//! evaluated into the joint and normal matrices skinned shaders consume.

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{RenderError, RenderResult};
use crate::math::{self, Mat3, Mat4, Quat, Vec3};

/// A sorted sequence of `(time, value)` keyframes, possibly empty.
#[derive(Debug, Clone)]
pub struct Track<T> {
    keyframes: Vec<(f32, T)>,
}

impl<T: Copy> Track<T> {
    pub fn new(keyframes: Vec<(f32, T)>) -> Track<T> {
        Track { keyframes }
    }

    /// Samples the track at `time`: clamped to the first/last key outside
    /// the covered range, interpolated inside it, `None` when empty.
    fn sample_with(&self, time: f32, interpolate: impl Fn(&T, &T, f32) -> T) -> Option<T> {
        let (first, last) = match (self.keyframes.first(), self.keyframes.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return None,
        };
        if time <= first.0 {
            return Some(first.1);
        }
        if time >= last.0 {
            return Some(last.1);
        }
        for window in self.keyframes.windows(2) {
            let (curr_time, curr_value) = window[0];
            let (next_time, next_value) = window[1];
            if time >= curr_time && time < next_time {
                let t = (time - curr_time) / (next_time - curr_time);
                return Some(interpolate(&curr_value, &next_value, t));
            }
        }
        unreachable!("keyframe times are not sorted");
    }
}

#[derive(Debug, Clone)]
struct Joint {
    parent_index: Option<usize>,
    inverse_bind: Mat4,
    translations: Track<Vec3>,
    rotations: Track<Quat>,
    scales: Track<Vec3>,
    /// Model-space transform of the latest pose evaluation.
    transform: Mat4,
}

/// A joint hierarchy in parent-before-child order, with the cached result
/// of the latest pose evaluation.
#[derive(Debug, Clone)]
pub struct Skeleton {
    min_time: f32,
    max_time: f32,
    joints: Vec<Joint>,
    joint_matrices: Vec<Mat4>,
    normal_matrices: Vec<Mat3>,
    last_time: Option<f32>,
}

impl Skeleton {
    /// Loads a skeleton file.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Skeleton> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RenderError::FileNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let skeleton = Skeleton::parse(&text)?;
        debug!(
            "loaded skeleton {} ({} joints)",
            path.display(),
            skeleton.num_joints()
        );
        Ok(skeleton)
    }

    /// Parses the section-oriented text format described by the skeleton
    /// file contract.
    pub fn parse(text: &str) -> RenderResult<Skeleton> {
        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

        let num_joints: usize = tagged_value(&mut lines, "joint-size:")?;
        if num_joints == 0 {
            return Err(RenderError::malformed("skeleton has no joints"));
        }
        let range_line = expect_prefix(&mut lines, "time-range:")?;
        let [min_time, max_time] = parse_bracketed::<2>(&range_line)?;
        if min_time >= max_time {
            return Err(RenderError::malformed("skeleton time range is empty"));
        }

        let mut joints = Vec::with_capacity(num_joints);
        for joint_index in 0..num_joints {
            let ordinal_line = expect_prefix(&mut lines, "joint")?;
            let ordinal: usize = ordinal_line
                .trim_end_matches(':')
                .trim()
                .parse()
                .map_err(|_| RenderError::malformed("bad joint ordinal"))?;
            if ordinal != joint_index {
                return Err(RenderError::malformed(format!(
                    "joint {ordinal} out of order (expected {joint_index})"
                )));
            }

            let parent: i64 = tagged_value(&mut lines, "parent-index:")?;
            let parent_index = match parent {
                -1 => None,
                p if p >= 0 && (p as usize) < joint_index => Some(p as usize),
                _ => {
                    return Err(RenderError::malformed(format!(
                        "joint {joint_index} has invalid parent {parent}"
                    )));
                }
            };

            expect_prefix(&mut lines, "inverse-bind:")?;
            let mut inverse_bind = Mat4::zeros();
            for row in 0..4 {
                let line = lines
                    .next()
                    .ok_or_else(|| RenderError::malformed("truncated inverse-bind matrix"))?;
                let mut fields = line.split_whitespace();
                for col in 0..4 {
                    inverse_bind[(row, col)] = fields
                        .next()
                        .and_then(|field| field.parse().ok())
                        .ok_or_else(|| RenderError::malformed("bad inverse-bind row"))?;
                }
            }

            let translations = parse_track(&mut lines, "translations", |[x, y, z]: [f32; 3]| {
                Vec3::new(x, y, z)
            })?;
            let rotations = parse_track(&mut lines, "rotations", |[x, y, z, w]: [f32; 4]| {
                Quat::new(w, x, y, z)
            })?;
            let scales =
                parse_track(&mut lines, "scales", |[x, y, z]: [f32; 3]| Vec3::new(x, y, z))?;

            joints.push(Joint {
                parent_index,
                inverse_bind,
                translations,
                rotations,
                scales,
                transform: Mat4::identity(),
            });
        }

        Ok(Skeleton {
            min_time,
            max_time,
            joint_matrices: vec![Mat4::zeros(); joints.len()],
            normal_matrices: vec![Mat3::zeros(); joints.len()],
            joints,
            last_time: None,
        })
    }

    #[inline]
    pub fn num_joints(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    pub fn min_time(&self) -> f32 {
        self.min_time
    }

    #[inline]
    pub fn max_time(&self) -> f32 {
        self.max_time
    }

    /// Evaluates the pose at `frame_time`, wrapped into the animation
    /// range. Re-evaluating the same wrapped time is a no-op thanks to the
    /// cached last evaluation time.
    pub fn update_joints(&mut self, frame_time: f32) {
        let frame_time = frame_time % self.max_time;
        if self.last_time == Some(frame_time) {
            return;
        }
        for index in 0..self.joints.len() {
            let joint = &self.joints[index];
            let translation = joint
                .translations
                .sample_with(frame_time, |a, b, t| a.lerp(b, t))
                .unwrap_or_else(Vec3::zeros);
            let rotation = joint
                .rotations
                .sample_with(frame_time, |a, b, t| math::slerp(a, b, t))
                .unwrap_or_else(|| Quat::new(1.0, 0.0, 0.0, 0.0));
            let scale = joint
                .scales
                .sample_with(frame_time, |a, b, t| a.lerp(b, t))
                .unwrap_or_else(|| Vec3::repeat(1.0));

            let mut transform = math::from_trs(&translation, &rotation, &scale);
            if let Some(parent) = self.joints[index].parent_index {
                transform = self.joints[parent].transform * transform;
            }
            self.joints[index].transform = transform;

            let joint_matrix = transform * self.joints[index].inverse_bind;
            self.joint_matrices[index] = joint_matrix;
            self.normal_matrices[index] =
                math::inverse_transpose3(&math::upper_left3(&joint_matrix));
        }
        self.last_time = Some(frame_time);
    }

    /// Model-space joint matrices (combined transform x inverse bind) of
    /// the latest pose evaluation.
    #[inline]
    pub fn joint_matrices(&self) -> &[Mat4] {
        &self.joint_matrices
    }

    /// Inverse-transpose 3x3 companions of the joint matrices.
    #[inline]
    pub fn normal_matrices(&self) -> &[Mat3] {
        &self.normal_matrices
    }
}

fn expect_prefix<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    prefix: &str,
) -> RenderResult<String> {
    let line = lines
        .next()
        .ok_or_else(|| RenderError::malformed(format!("missing {prefix:?} section")))?;
    line.strip_prefix(prefix)
        .map(|rest| rest.trim().to_string())
        .ok_or_else(|| RenderError::malformed(format!("expected {prefix:?}, found {line:?}")))
}

fn tagged_value<'a, T: std::str::FromStr>(
    lines: &mut impl Iterator<Item = &'a str>,
    tag: &str,
) -> RenderResult<T> {
    expect_prefix(lines, tag)?
        .parse()
        .map_err(|_| RenderError::malformed(format!("bad value for {tag:?}")))
}

/// Parses `"[a, b, ...]"` into N floats.
fn parse_bracketed<const N: usize>(text: &str) -> RenderResult<[f32; N]> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| RenderError::malformed(format!("expected bracketed list: {text:?}")))?;
    let mut values = [0.0; N];
    let mut fields = inner.split(',');
    for value in values.iter_mut() {
        *value = fields
            .next()
            .and_then(|field| field.trim().parse().ok())
            .ok_or_else(|| RenderError::malformed(format!("bad bracketed list: {text:?}")))?;
    }
    Ok(values)
}

fn parse_track<'a, const N: usize, T: Copy>(
    lines: &mut impl Iterator<Item = &'a str>,
    tag: &str,
    build: fn([f32; N]) -> T,
) -> RenderResult<Track<T>> {
    let header = expect_prefix(lines, tag)?;
    let count: usize = header
        .trim_end_matches(':')
        .trim()
        .parse()
        .map_err(|_| RenderError::malformed(format!("bad {tag} count")))?;

    let mut keyframes = Vec::with_capacity(count);
    let mut previous_time = f32::NEG_INFINITY;
    for _ in 0..count {
        let line = lines
            .next()
            .ok_or_else(|| RenderError::malformed(format!("truncated {tag} track")))?;
        let rest = line
            .strip_prefix("time:")
            .ok_or_else(|| RenderError::malformed(format!("bad keyframe line: {line:?}")))?;
        let (time_text, value_text) = rest
            .split_once(", value:")
            .ok_or_else(|| RenderError::malformed(format!("bad keyframe line: {line:?}")))?;
        let time: f32 = time_text
            .trim()
            .parse()
            .map_err(|_| RenderError::malformed(format!("bad keyframe time: {line:?}")))?;
        if time < previous_time {
            return Err(RenderError::malformed(format!("{tag} track is not sorted")));
        }
        previous_time = time;
        keyframes.push((time, build(parse_bracketed(value_text)?)));
    }
    Ok(Track::new(keyframes))
}
