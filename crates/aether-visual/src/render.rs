//! Render directives - what the external renderer should draw
//!
//! The renderer is an external collaborator. This module turns the current
//! visual state into plain data it can consume: a style per filter and one
//! directive per module, both built by exhaustive matches so a new variant
//! cannot be silently ignored.

use aether_core::{FaceFrame, FilterState, Landmark, ModuleState, SharedFace, NOSE_TIP};

/// Scene units per normalized screen unit
pub const SCENE_SCALE: f32 = 10.0;

/// Forward offset of the core module from the nose tip
pub const CORE_FORWARD_OFFSET: f32 = 0.5;

/// Color in RGB (0.0 - 1.0 range)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// From a 24-bit `0xRRGGBB` value
    pub fn from_rgb24(rgb: u32) -> Self {
        let channel = |shift: u32| ((rgb >> shift) & 0xff) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    pub fn to_rgb24(self) -> u32 {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    /// `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{:06x}", self.to_rgb24())
    }
}

/// Color grading applied to the backing video
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VideoGrade {
    pub hue_rotate_deg: f32,
    pub saturate: f32,
    pub sepia: f32,
    pub contrast: f32,
    pub grayscale: f32,
    pub opacity: f32,
}

impl VideoGrade {
    pub const NONE: VideoGrade = VideoGrade {
        hue_rotate_deg: 0.0,
        saturate: 1.0,
        sepia: 0.0,
        contrast: 1.0,
        grayscale: 0.0,
        opacity: 1.0,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::NONE
    }
}

/// Visual style for one filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterStyle {
    pub accent: Color,
    pub label: &'static str,
    pub grade: VideoGrade,
}

impl FilterStyle {
    pub fn for_filter(filter: FilterState) -> Self {
        match filter {
            FilterState::Standard => FilterStyle {
                accent: Color::from_rgb24(0x22d3ee),
                label: filter.label(),
                grade: VideoGrade::NONE,
            },
            FilterState::Neural => FilterStyle {
                accent: Color::from_rgb24(0xa855f7),
                label: filter.label(),
                grade: VideoGrade {
                    hue_rotate_deg: 240.0,
                    saturate: 1.5,
                    ..VideoGrade::NONE
                },
            },
            FilterState::Combat => FilterStyle {
                accent: Color::from_rgb24(0xef4444),
                label: filter.label(),
                grade: VideoGrade {
                    sepia: 0.3,
                    hue_rotate_deg: 320.0,
                    contrast: 1.2,
                    ..VideoGrade::NONE
                },
            },
            FilterState::Ghost => FilterStyle {
                accent: Color::from_rgb24(0xf59e0b),
                label: filter.label(),
                grade: VideoGrade {
                    grayscale: 1.0,
                    opacity: 0.7,
                    ..VideoGrade::NONE
                },
            },
        }
    }
}

/// Point in renderer scene space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScenePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl ScenePoint {
    /// Project a normalized landmark. Mirrored horizontally, y up, z toward
    /// the viewer.
    pub fn project(landmark: Landmark) -> Self {
        ScenePoint {
            x: (landmark.x - 0.5) * -SCENE_SCALE,
            y: -(landmark.y - 0.5) * SCENE_SCALE,
            z: -landmark.z * SCENE_SCALE,
        }
    }
}

/// Per-module drawing instruction
#[derive(Debug, Clone, PartialEq)]
pub enum RenderDirective {
    /// Every face point, drawn as a mesh cloud
    PointCloud { points: Vec<ScenePoint> },
    /// Rotating core anchored in front of the nose tip
    Core { anchor: ScenePoint },
    /// Pulsing sphere at the nose tip
    Pulse { anchor: ScenePoint },
    /// Point cloud with distortion
    Glitch { points: Vec<ScenePoint> },
    /// Nothing to draw (no face, or anchor missing)
    Idle,
}

impl RenderDirective {
    pub fn build(module: ModuleState, face: Option<&FaceFrame>) -> Self {
        let Some(face) = face else {
            return RenderDirective::Idle;
        };
        let cloud = || -> Vec<ScenePoint> {
            face.landmarks().iter().copied().map(ScenePoint::project).collect()
        };
        let anchor = face.landmark(NOSE_TIP).map(ScenePoint::project);

        match module {
            ModuleState::Mesh => RenderDirective::PointCloud { points: cloud() },
            ModuleState::Glitch => RenderDirective::Glitch { points: cloud() },
            ModuleState::Core => match anchor {
                Some(mut anchor) => {
                    anchor.z += CORE_FORWARD_OFFSET;
                    RenderDirective::Core { anchor }
                }
                None => RenderDirective::Idle,
            },
            ModuleState::Pulse => match anchor {
                Some(anchor) => RenderDirective::Pulse { anchor },
                None => RenderDirective::Idle,
            },
        }
    }

    pub fn is_distorted(&self) -> bool {
        matches!(self, RenderDirective::Glitch { .. })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, RenderDirective::Idle)
    }
}

/// The ghost frame is only drawn under the ghost filter
pub fn ghost_for(filter: FilterState, ghost: Option<&SharedFace>) -> Option<SharedFace> {
    match filter {
        FilterState::Ghost => ghost.cloned(),
        FilterState::Standard | FilterState::Neural | FilterState::Combat => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_core::FrameTime;

    fn face() -> FaceFrame {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); 5];
        points[NOSE_TIP] = Landmark::new(0.6, 0.4, -0.1);
        FaceFrame::new(FrameTime::ZERO, points, None)
    }

    #[test]
    fn test_filter_palette() {
        let hex: Vec<String> = FilterState::ALL
            .iter()
            .map(|f| FilterStyle::for_filter(*f).accent.to_hex())
            .collect();
        assert_eq!(hex, vec!["#22d3ee", "#a855f7", "#ef4444", "#f59e0b"]);
        assert!(FilterStyle::for_filter(FilterState::Standard).grade.is_identity());
        assert_eq!(FilterStyle::for_filter(FilterState::Ghost).label, "GHOST_MODE");
    }

    #[test]
    fn test_combat_grade() {
        let grade = FilterStyle::for_filter(FilterState::Combat).grade;
        assert_eq!(grade.sepia, 0.3);
        assert_eq!(grade.hue_rotate_deg, 320.0);
        assert_eq!(grade.contrast, 1.2);
        assert_eq!(grade.opacity, 1.0);
    }

    #[test]
    fn test_projection() {
        let p = ScenePoint::project(Landmark::new(0.6, 0.4, -0.1));
        assert!((p.x - -1.0).abs() < 1e-5);
        assert!((p.y - 1.0).abs() < 1e-5);
        assert!((p.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_directive_per_module() {
        let face = face();
        match RenderDirective::build(ModuleState::Core, Some(&face)) {
            RenderDirective::Core { anchor } => assert!((anchor.z - 1.5).abs() < 1e-5),
            other => panic!("unexpected directive {:?}", other),
        }
        match RenderDirective::build(ModuleState::Mesh, Some(&face)) {
            RenderDirective::PointCloud { points } => assert_eq!(points.len(), 5),
            other => panic!("unexpected directive {:?}", other),
        }
        assert!(RenderDirective::build(ModuleState::Glitch, Some(&face)).is_distorted());
        assert!(RenderDirective::build(ModuleState::Pulse, None).is_idle());
    }

    #[test]
    fn test_anchor_missing_is_idle() {
        let sparse = FaceFrame::new(FrameTime::ZERO, vec![Landmark::default()], None);
        assert!(RenderDirective::build(ModuleState::Pulse, Some(&sparse)).is_idle());
    }

    #[test]
    fn test_ghost_gated_by_filter() {
        let ghost = face().into_shared();
        assert!(ghost_for(FilterState::Ghost, Some(&ghost)).is_some());
        assert!(ghost_for(FilterState::Neural, Some(&ghost)).is_none());
        assert!(ghost_for(FilterState::Ghost, None).is_none());
    }
}
