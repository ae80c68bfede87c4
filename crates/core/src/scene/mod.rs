use std::f32::consts::PI;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::{LavaError, Result};

pub const CONE_HOLDER: &str = "cone-holder";
pub const MOUTH: &str = "mouth";
pub const SCOOP: &str = "scoop";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// Linear interpolation towards `other`; `k = 0` returns `self`, `k = 1`
    /// returns `other` exactly.
    pub fn lerp(self, other: Self, k: f32) -> Self {
        if k >= 1.0 {
            return other;
        }
        self + (other - self) * k
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

/// Position, Euler rotation (radians, XYZ order) and per-axis scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position: position.into(),
            ..Self::default()
        }
    }

    pub fn rotated(mut self, rotation: [f32; 3]) -> Self {
        self.rotation = rotation.into();
        self
    }
}

/// Packed `0xRRGGBB` colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Self = Self(0x000000);
}

/// Narrow write access to a material's glow. The timeline only ever needs this.
pub trait EmissiveMaterial {
    fn set_emissive_intensity(&mut self, intensity: f32);
}

/// Physically based material parameters understood by the host renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardMaterial {
    pub color: Color,
    pub emissive: Color,
    pub emissive_intensity: f32,
    pub roughness: f32,
    pub metalness: f32,
}

impl StandardMaterial {
    pub fn matte(color: u32, roughness: f32) -> Self {
        Self {
            color: Color(color),
            emissive: Color::BLACK,
            emissive_intensity: 1.0,
            roughness,
            metalness: 0.0,
        }
    }

    pub fn lava() -> Self {
        Self {
            color: Color(0xff6a00),
            emissive: Color(0xff4500),
            emissive_intensity: 2.5,
            roughness: 0.4,
            metalness: 0.1,
        }
    }
}

impl EmissiveMaterial for StandardMaterial {
    fn set_emissive_intensity(&mut self, intensity: f32) {
        self.emissive_intensity = intensity;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Primitive {
    /// Empty transform node that only carries children.
    Group,
    Plane {
        width: f32,
        height: f32,
    },
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        segments: u32,
    },
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
        /// Polar sweep in radians; `PI` is a full sphere.
        theta_length: f32,
    },
    Cuboid {
        width: f32,
        height: f32,
        depth: f32,
    },
    Cone {
        radius: f32,
        height: f32,
        segments: u32,
    },
}

impl Primitive {
    fn sphere(radius: f32, segments: u32) -> Self {
        Self::Sphere {
            radius,
            width_segments: segments,
            height_segments: segments,
            theta_length: PI,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenePart {
    pub name: String,
    pub primitive: Primitive,
    pub transform: Transform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<StandardMaterial>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ScenePart>,
}

impl ScenePart {
    fn mesh(name: &str, primitive: Primitive, transform: Transform, material: StandardMaterial) -> Self {
        Self {
            name: name.to_string(),
            primitive,
            transform,
            material: Some(material),
            children: Vec::new(),
        }
    }

    fn group(name: &str, transform: Transform, children: Vec<ScenePart>) -> Self {
        Self {
            name: name.to_string(),
            primitive: Primitive::Group,
            transform,
            material: None,
            children,
        }
    }

    fn find(&self, name: &str) -> Option<&ScenePart> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }
}

/// Camera, lights and post-processing the host renderer should set up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSetup {
    pub camera_position: Vec3,
    pub camera_fov_degrees: f32,
    pub ambient_intensity: f32,
    pub key_light_position: Vec3,
    pub key_light_intensity: f32,
    pub bloom_intensity: f32,
    pub bloom_threshold: f32,
    pub bloom_smoothing: f32,
    pub background: Color,
}

impl Default for StageSetup {
    fn default() -> Self {
        Self {
            camera_position: Vec3::new(2.5, 1.8, 3.2),
            camera_fov_degrees: 50.0,
            ambient_intensity: 0.4,
            key_light_position: Vec3::new(5.0, 10.0, 5.0),
            key_light_intensity: 1.2,
            bloom_intensity: 1.2,
            bloom_threshold: 0.2,
            bloom_smoothing: 0.9,
            background: Color(0x0b0f1a),
        }
    }
}

/// Declarative description of the whole scene graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescriptor {
    pub name: String,
    pub stage: StageSetup,
    pub parts: Vec<ScenePart>,
}

impl SceneDescriptor {
    /// The girl, her cone and the lava scoop, in their rest poses.
    pub fn lava_icecream() -> Self {
        let skin = StandardMaterial::matte(0xffd7b5, 0.6);
        let hair = StandardMaterial::matte(0x2f2a44, 0.9);
        let dress = StandardMaterial::matte(0x3a5ad9, 0.9);
        let eye = StandardMaterial::matte(0x111111, 1.0);

        let ground = ScenePart::mesh(
            "ground",
            Primitive::Plane {
                width: 20.0,
                height: 20.0,
            },
            Transform::default().rotated([-PI / 2.0, 0.0, 0.0]),
            StandardMaterial::matte(0x0e1424, 1.0),
        );

        let girl = ScenePart::group(
            "girl",
            Transform::default(),
            vec![
                ScenePart::mesh(
                    "body",
                    Primitive::Cylinder {
                        radius_top: 0.35,
                        radius_bottom: 0.5,
                        height: 1.2,
                        segments: 16,
                    },
                    Transform::at([0.0, 0.9, 0.0]),
                    dress,
                ),
                ScenePart::mesh("head", Primitive::sphere(0.35, 24), Transform::at([0.0, 1.7, 0.0]), skin),
                ScenePart::mesh(
                    "hair-cap",
                    Primitive::Sphere {
                        radius: 0.37,
                        width_segments: 24,
                        height_segments: 24,
                        theta_length: PI / 1.6,
                    },
                    Transform::at([0.0, 1.78, -0.02]),
                    hair,
                ),
                ScenePart::mesh(
                    "left-eye",
                    Primitive::sphere(0.04, 12),
                    Transform::at([-0.12, 1.72, 0.31]),
                    eye.clone(),
                ),
                ScenePart::mesh("right-eye", Primitive::sphere(0.04, 12), Transform::at([0.12, 1.72, 0.31]), eye),
                ScenePart::mesh(
                    MOUTH,
                    Primitive::Cuboid {
                        width: 0.3,
                        height: 0.06,
                        depth: 0.06,
                    },
                    Transform::at([0.0, 1.60, 0.33]),
                    StandardMaterial::matte(0x772233, 0.6),
                ),
            ],
        );

        let cone_holder = ScenePart::group(
            CONE_HOLDER,
            Transform::at([1.8, 1.1, 0.6]).rotated([0.0, 0.0, -0.6]),
            vec![
                ScenePart::mesh(
                    "cone",
                    Primitive::Cone {
                        radius: 0.13,
                        height: 0.3,
                        segments: 16,
                    },
                    Transform::at([0.0, -0.15, 0.0]).rotated([PI, 0.0, 0.0]),
                    StandardMaterial::matte(0xb67c3b, 1.0),
                ),
                ScenePart::mesh(SCOOP, Primitive::sphere(0.16, 24), Transform::at([0.0, 0.03, 0.0]), StandardMaterial::lava()),
            ],
        );

        Self {
            name: "Lava Ice-Cream".to_string(),
            stage: StageSetup::default(),
            parts: vec![ground, girl, cone_holder],
        }
    }

    pub fn find(&self, name: &str) -> Option<&ScenePart> {
        self.parts.iter().find_map(|part| part.find(name))
    }
}

/// Write access to the animated parts of a scene. Each handle is optional so
/// a host that has not built a part yet is simply skipped.
pub trait AnimatedRig {
    fn cone_holder(&mut self) -> Option<&mut Transform>;
    fn mouth(&mut self) -> Option<&mut Transform>;
    fn scoop(&mut self) -> Option<(&mut Transform, &mut dyn EmissiveMaterial)>;
}

/// Owned mutable state of the three animated parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rig {
    pub cone_holder: Transform,
    pub mouth: Transform,
    pub scoop: Transform,
    pub scoop_material: StandardMaterial,
}

impl Rig {
    pub fn from_descriptor(scene: &SceneDescriptor) -> Result<Self> {
        let part = |name: &str| {
            scene
                .find(name)
                .ok_or_else(|| LavaError::msg(format!("scene `{}` has no `{name}` part", scene.name)))
        };

        let cone_holder = part(CONE_HOLDER)?.transform;
        let mouth = part(MOUTH)?.transform;
        let scoop = part(SCOOP)?;
        let scoop_material = scoop
            .material
            .clone()
            .ok_or_else(|| LavaError::msg("scoop part has no material"))?;

        Ok(Self {
            cone_holder,
            mouth,
            scoop: scoop.transform,
            scoop_material,
        })
    }

    /// Rest pose of the built-in scene.
    pub fn lava_icecream() -> Result<Self> {
        Self::from_descriptor(&SceneDescriptor::lava_icecream())
    }
}

impl AnimatedRig for Rig {
    fn cone_holder(&mut self) -> Option<&mut Transform> {
        Some(&mut self.cone_holder)
    }

    fn mouth(&mut self) -> Option<&mut Transform> {
        Some(&mut self.mouth)
    }

    fn scoop(&mut self) -> Option<(&mut Transform, &mut dyn EmissiveMaterial)> {
        Some((&mut self.scoop, &mut self.scoop_material))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_hits_both_endpoints() {
        let a = Vec3::new(1.8, 1.1, 0.6);
        let b = Vec3::new(0.0, 1.2, 0.5);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
    }

    #[test]
    fn descriptor_exposes_animated_parts() {
        let scene = SceneDescriptor::lava_icecream();
        for name in [CONE_HOLDER, MOUTH, SCOOP] {
            assert!(scene.find(name).is_some(), "missing {name}");
        }
        let scoop = scene.find(SCOOP).unwrap();
        assert_eq!(scoop.material.as_ref().unwrap().emissive, Color(0xff4500));
    }

    #[test]
    fn rig_starts_in_the_descriptor_rest_pose() {
        let rig = Rig::lava_icecream().unwrap();
        assert_eq!(rig.cone_holder, Transform::at([1.8, 1.1, 0.6]).rotated([0.0, 0.0, -0.6]));
        assert_eq!(rig.mouth, Transform::at([0.0, 1.60, 0.33]));
        assert_eq!(rig.scoop, Transform::at([0.0, 0.03, 0.0]));
        assert_eq!(rig.scoop_material, StandardMaterial::lava());
    }

    #[test]
    fn rig_requires_every_animated_part() {
        let mut scene = SceneDescriptor::lava_icecream();
        scene.parts.retain(|part| part.name != CONE_HOLDER);

        let err = Rig::from_descriptor(&scene).unwrap_err();
        assert!(format!("{err}").contains(CONE_HOLDER));
    }

    #[test]
    fn rig_reports_a_missing_mouth() {
        let mut scene = SceneDescriptor::lava_icecream();
        for part in &mut scene.parts {
            part.children.retain(|child| child.name != MOUTH);
        }

        let err = Rig::from_descriptor(&scene).unwrap_err();
        assert!(format!("{err}").contains(MOUTH));
    }

    #[test]
    fn rig_reports_a_missing_scoop() {
        let mut scene = SceneDescriptor::lava_icecream();
        for part in &mut scene.parts {
            part.children.retain(|child| child.name != SCOOP);
        }

        let err = Rig::from_descriptor(&scene).unwrap_err();
        assert!(format!("{err}").contains(SCOOP));
    }

    #[test]
    fn rig_requires_a_scoop_material() {
        let mut scene = SceneDescriptor::lava_icecream();
        for part in &mut scene.parts {
            for child in &mut part.children {
                if child.name == SCOOP {
                    child.material = None;
                }
            }
        }

        let err = Rig::from_descriptor(&scene).unwrap_err();
        assert!(format!("{err}").contains("material"));
    }

    #[test]
    fn emissive_capability_only_touches_intensity() {
        let mut material = StandardMaterial::lava();
        material.set_emissive_intensity(4.0);
        assert_eq!(material.emissive_intensity, 4.0);
        assert_eq!(material.color, StandardMaterial::lava().color);
    }

    #[test]
    fn descriptor_serialises_to_json() {
        let json = serde_json::to_string(&SceneDescriptor::lava_icecream()).unwrap();
        assert!(json.contains("\"cone-holder\""));
        let back: SceneDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.parts.len(), 3);
    }
}
