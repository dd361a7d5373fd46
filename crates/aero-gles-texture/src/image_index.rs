//! Texture types, targets and subresource addressing.

use std::ops::Range;

/// Highest mip level index the texture model stores descriptions for.
pub const IMPLEMENTATION_MAX_TEXTURE_LEVELS: u32 = 16;

/// Number of faces of a cube map.
pub const CUBE_FACE_COUNT: u32 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureType {
    D2,
    D2Array,
    D2Multisample,
    D2MultisampleArray,
    D3,
    Rectangle,
    External,
    CubeMap,
    CubeMapArray,
    Buffer,
}

impl TextureType {
    pub fn is_mipmap_supported(self) -> bool {
        !matches!(
            self,
            TextureType::D2Multisample | TextureType::D2MultisampleArray | TextureType::Buffer
        )
    }

    pub fn is_multisampled(self) -> bool {
        matches!(self, TextureType::D2Multisample | TextureType::D2MultisampleArray)
    }

    pub fn is_array(self) -> bool {
        matches!(
            self,
            TextureType::D2Array | TextureType::D2MultisampleArray | TextureType::CubeMapArray
        )
    }

    /// Number of image description slots per level.
    pub fn faces(self) -> u32 {
        if self == TextureType::CubeMap {
            CUBE_FACE_COUNT
        } else {
            1
        }
    }

    /// The single target of a non-cube type.
    pub fn non_cube_target(self) -> TextureTarget {
        match self {
            TextureType::D2 => TextureTarget::D2,
            TextureType::D2Array => TextureTarget::D2Array,
            TextureType::D2Multisample => TextureTarget::D2Multisample,
            TextureType::D2MultisampleArray => TextureTarget::D2MultisampleArray,
            TextureType::D3 => TextureTarget::D3,
            TextureType::Rectangle => TextureTarget::Rectangle,
            TextureType::External => TextureTarget::External,
            TextureType::CubeMapArray => TextureTarget::CubeMapArray,
            TextureType::Buffer => TextureTarget::Buffer,
            TextureType::CubeMap => unreachable!("cube maps address images through face targets"),
        }
    }

    /// `face` selects the cube face for cube maps and is ignored otherwise.
    pub fn target(self, face: u32) -> TextureTarget {
        if self == TextureType::CubeMap {
            TextureTarget::cube_face(face)
        } else {
            self.non_cube_target()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    D2,
    D2Array,
    D2Multisample,
    D2MultisampleArray,
    D3,
    Rectangle,
    External,
    CubeMapPositiveX,
    CubeMapNegativeX,
    CubeMapPositiveY,
    CubeMapNegativeY,
    CubeMapPositiveZ,
    CubeMapNegativeZ,
    CubeMapArray,
    Buffer,
}

impl TextureTarget {
    pub const CUBE_FACES: [TextureTarget; 6] = [
        TextureTarget::CubeMapPositiveX,
        TextureTarget::CubeMapNegativeX,
        TextureTarget::CubeMapPositiveY,
        TextureTarget::CubeMapNegativeY,
        TextureTarget::CubeMapPositiveZ,
        TextureTarget::CubeMapNegativeZ,
    ];

    pub fn cube_face(face: u32) -> TextureTarget {
        assert!(face < CUBE_FACE_COUNT, "cube face {face} out of range");
        Self::CUBE_FACES[face as usize]
    }

    pub fn cube_face_index(self) -> Option<u32> {
        Self::CUBE_FACES
            .iter()
            .position(|&face| face == self)
            .map(|index| index as u32)
    }

    pub fn is_cube_face(self) -> bool {
        self.cube_face_index().is_some()
    }

    pub fn texture_type(self) -> TextureType {
        match self {
            TextureTarget::D2 => TextureType::D2,
            TextureTarget::D2Array => TextureType::D2Array,
            TextureTarget::D2Multisample => TextureType::D2Multisample,
            TextureTarget::D2MultisampleArray => TextureType::D2MultisampleArray,
            TextureTarget::D3 => TextureType::D3,
            TextureTarget::Rectangle => TextureType::Rectangle,
            TextureTarget::External => TextureType::External,
            TextureTarget::CubeMapArray => TextureType::CubeMapArray,
            TextureTarget::Buffer => TextureType::Buffer,
            _ => TextureType::CubeMap,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extents {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extents {
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Any zero dimension makes the extent empty.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }

    /// Extent of the level `relative_level` steps below this one. Depth is only halved when
    /// `halve_depth` is set; array layers keep their count.
    pub fn mip(&self, relative_level: u32, halve_depth: bool) -> Extents {
        let shift = |value: u32| value.checked_shr(relative_level).unwrap_or(0).max(1);
        Extents {
            width: shift(self.width),
            height: shift(self.height),
            depth: if halve_depth {
                shift(self.depth)
            } else {
                self.depth
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Offset {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// A 3D region of a subresource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Box3D {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
}

impl Box3D {
    pub const fn new(x: i32, y: i32, z: i32, width: i32, height: i32, depth: i32) -> Self {
        Self {
            x,
            y,
            z,
            width,
            height,
            depth,
        }
    }

    pub fn covers_same_extent(&self, extents: &Extents) -> bool {
        self.x == 0
            && self.y == 0
            && self.z == 0
            && i64::from(self.width) == i64::from(extents.width)
            && i64::from(self.height) == i64::from(extents.height)
            && i64::from(self.depth) == i64::from(extents.depth)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn x1(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn y1(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Intersection of two rectangles, `None` when they do not overlap.
    pub fn clip(&self, bounds: &Rectangle) -> Option<Rectangle> {
        let x0 = self.x.max(bounds.x);
        let y0 = self.y.max(bounds.y);
        let x1 = self.x1().min(bounds.x1());
        let y1 = self.y1().min(bounds.y1());
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some(Rectangle::new(x0, y0, x1 - x0, y1 - y0))
    }
}

/// Addresses one level of a texture, optionally narrowed to a layer range (or a cube face).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageIndex {
    texture_type: TextureType,
    level: u32,
    /// `None` addresses every layer of the level.
    layer: Option<u32>,
    layer_count: u32,
}

impl ImageIndex {
    pub fn new(
        texture_type: TextureType,
        level: u32,
        layer: Option<u32>,
        layer_count: u32,
    ) -> Self {
        Self {
            texture_type,
            level,
            layer,
            layer_count,
        }
    }

    pub fn make_2d(level: u32) -> Self {
        Self::new(TextureType::D2, level, None, 1)
    }

    pub fn make_cube_map_face(target: TextureTarget, level: u32) -> Self {
        let face = target
            .cube_face_index()
            .unwrap_or_else(|| panic!("{target:?} is not a cube face"));
        Self::new(TextureType::CubeMap, level, Some(face), 1)
    }

    /// Builds the index a mutation of `target` with `depth` layers addresses.
    pub fn from_target(target: TextureTarget, level: u32, depth: u32) -> Self {
        if target.is_cube_face() {
            return Self::make_cube_map_face(target, level);
        }
        let texture_type = target.texture_type();
        if texture_type.is_array() || texture_type == TextureType::D3 {
            Self::new(texture_type, level, None, depth)
        } else {
            Self::new(texture_type, level, None, 1)
        }
    }

    pub fn texture_type(&self) -> TextureType {
        self.texture_type
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn layer(&self) -> Option<u32> {
        self.layer
    }

    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    pub fn has_layer(&self) -> bool {
        self.layer.is_some()
    }

    pub fn is_entire_level_cube_map(&self) -> bool {
        self.texture_type == TextureType::CubeMap && self.layer.is_none()
    }

    /// Target of the addressed image. Entire-level cube indices report the first face.
    pub fn target(&self) -> TextureTarget {
        self.texture_type.target(self.layer.unwrap_or(0))
    }

    /// Every image of `texture_type` in `levels`, one index per cube face for cube maps and one
    /// per layer in `layers` when a layer range is given for layered types.
    pub fn iter_generic(
        texture_type: TextureType,
        levels: Range<u32>,
        layers: Option<Range<u32>>,
    ) -> impl Iterator<Item = ImageIndex> {
        levels.flat_map(move |level| {
            let per_level: Vec<ImageIndex> = if texture_type == TextureType::CubeMap {
                let faces = layers.clone().unwrap_or(0..CUBE_FACE_COUNT);
                faces
                    .filter(|&face| face < CUBE_FACE_COUNT)
                    .map(|face| ImageIndex::new(texture_type, level, Some(face), 1))
                    .collect()
            } else if let (true, Some(layers)) = (
                texture_type.is_array() || texture_type == TextureType::D3,
                layers.clone(),
            ) {
                layers
                    .map(|layer| ImageIndex::new(texture_type, level, Some(layer), 1))
                    .collect()
            } else {
                vec![ImageIndex::new(texture_type, level, None, 1)]
            };
            per_level.into_iter()
        })
    }
}
