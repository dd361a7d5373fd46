//! A renderable subresource of a texture, renderbuffer or surface image.
//!
//! A [`RenderTarget`] does not own its images; it shares them with whatever object allocated
//! them and picks the one holding the authoritative data. With multisampled-render-to-texture
//! and YUV resolve, the render pass draws into a transient image and the resolve image is the
//! owner of the data.

use std::rc::Rc;

use aero_gles_texture::{Extents, ImageIndex, InternalFormat, TextureType};

use crate::error::Result;
use crate::hal::{CommandRecorder, Device, ImageAspects, ImageHandle, ImageViewHandle};
use crate::image::{
    DeferredClears, ImageHelper, ImageSubresourceSerial, ImageType, SharedImage, SharedImageViews,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderTargetTransience {
    /// The render pass image holds the data.
    #[default]
    Default,
    /// The render pass image is a transient multisampled image resolved into the resolve image.
    MultisampledTransient,
    /// The render pass image is transient and resolved into a YUV image.
    YuvResolveTransient,
    /// Both the render pass image and its resolve target are transient.
    EntirelyTransient,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttachmentAccessKind {
    Draw,
    Resolve,
}

/// One attachment use inside a render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttachmentAccess {
    pub image: ImageHandle,
    pub kind: AttachmentAccessKind,
    pub level_vk: u32,
    pub layer: u32,
    pub layer_count: u32,
    pub aspects: ImageAspects,
    pub color_index: Option<u32>,
}

/// Attachment uses collected while a render pass is being built.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderPassAccesses {
    accesses: Vec<AttachmentAccess>,
}

impl RenderPassAccesses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accesses(&self) -> &[AttachmentAccess] {
        &self.accesses
    }

    fn push(&mut self, access: AttachmentAccess) {
        self.accesses.push(access);
    }
}

#[derive(Debug, Default)]
pub struct RenderTarget {
    image: Option<SharedImage>,
    image_views: Option<SharedImageViews>,
    resolve_image: Option<SharedImage>,
    resolve_image_views: Option<SharedImageViews>,
    image_sibling_serial: u64,
    level_index_gl: u32,
    layer_index: u32,
    layer_count: u32,
    transience: RenderTargetTransience,
}

impl RenderTarget {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn init(
        &mut self,
        image: SharedImage,
        image_views: SharedImageViews,
        resolve_image: Option<SharedImage>,
        resolve_image_views: Option<SharedImageViews>,
        image_sibling_serial: u64,
        level_index_gl: u32,
        layer_index: u32,
        layer_count: u32,
        transience: RenderTargetTransience,
    ) {
        debug_assert!(layer_count > 0);
        debug_assert_eq!(resolve_image.is_some(), resolve_image_views.is_some());
        debug_assert!(transience == RenderTargetTransience::Default || resolve_image.is_some());

        self.image = Some(image);
        self.image_views = Some(image_views);
        self.resolve_image = resolve_image;
        self.resolve_image_views = resolve_image_views;
        self.image_sibling_serial = image_sibling_serial;
        self.level_index_gl = level_index_gl;
        self.layer_index = layer_index;
        self.layer_count = layer_count;
        self.transience = transience;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn image_ref(&self) -> &SharedImage {
        match &self.image {
            Some(image) => image,
            None => panic!("render target used before init"),
        }
    }

    fn image_views_ref(&self) -> &SharedImageViews {
        match &self.image_views {
            Some(views) => views,
            None => panic!("render target used before init"),
        }
    }

    fn resolve_refs(&self) -> (&SharedImage, &SharedImageViews) {
        match (&self.resolve_image, &self.resolve_image_views) {
            (Some(image), Some(views)) => (image, views),
            _ => panic!("render target has no resolve image"),
        }
    }

    pub fn image_sibling_serial(&self) -> u64 {
        self.image_sibling_serial
    }

    pub fn transience(&self) -> RenderTargetTransience {
        self.transience
    }

    pub fn is_image_transient(&self) -> bool {
        self.transience != RenderTargetTransience::Default
    }

    pub fn is_entirely_transient(&self) -> bool {
        self.transience == RenderTargetTransience::EntirelyTransient
    }

    pub fn is_resolve_image_owner_of_data(&self) -> bool {
        self.is_image_transient()
    }

    pub fn is_yuv_resolve(&self) -> bool {
        self.resolve_image
            .as_ref()
            .is_some_and(|image| image.borrow().is_yuv())
    }

    /// Whether the render pass resolves into a separate image whose contents outlive it.
    pub fn has_resolve_attachment(&self) -> bool {
        self.resolve_image.is_some() && !self.is_entirely_transient()
    }

    fn owner_of_data(&self) -> (&SharedImage, &SharedImageViews) {
        if self.is_resolve_image_owner_of_data() {
            self.resolve_refs()
        } else {
            (self.image_ref(), self.image_views_ref())
        }
    }

    pub fn image_for_render_pass(&self) -> SharedImage {
        Rc::clone(self.image_ref())
    }

    pub fn resolve_image_for_render_pass(&self) -> SharedImage {
        Rc::clone(self.resolve_refs().0)
    }

    pub fn image_for_copy(&self) -> SharedImage {
        Rc::clone(self.owner_of_data().0)
    }

    pub fn image_for_write(&self) -> SharedImage {
        Rc::clone(self.owner_of_data().0)
    }

    /// GL level to use for `image`: the render target's level on the owner of the data, level
    /// zero on a transient image.
    pub fn level_index_for_image(&self, image: &SharedImage) -> u32 {
        if Rc::ptr_eq(image, self.owner_of_data().0) {
            self.level_index_gl
        } else {
            0
        }
    }

    pub fn level_index(&self) -> u32 {
        self.level_index_gl
    }

    pub fn layer_index(&self) -> u32 {
        self.layer_index
    }

    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    pub fn is_3d_image(&self) -> bool {
        self.image_ref().borrow().image_type() == ImageType::D3
    }

    pub fn intended_format(&self) -> InternalFormat {
        self.image_ref().borrow().intended_format()
    }

    pub fn actual_format(&self) -> InternalFormat {
        self.image_ref().borrow().actual_format()
    }

    pub fn extents(&self) -> Extents {
        let image = self.image_ref().borrow();
        let level_vk = image.to_vk_level(self.level_index_for_image(self.image_ref()));
        let extents = image.level_extents(level_vk);
        Extents::new(extents.width, extents.height, 1)
    }

    pub fn rotated_extents(&self) -> Extents {
        let image = self.image_ref().borrow();
        let level_vk = image.to_vk_level(self.level_index_for_image(self.image_ref()));
        image.rotated_level_extents_2d(level_vk)
    }

    pub fn draw_subresource_serial(&self) -> ImageSubresourceSerial {
        self.image_views_ref()
            .borrow()
            .subresource_serial(self.level_index_gl, 1, self.layer_index, self.layer_count)
    }

    pub fn resolve_subresource_serial(&self) -> ImageSubresourceSerial {
        self.resolve_refs()
            .1
            .borrow()
            .subresource_serial(self.level_index_gl, 1, self.layer_index, self.layer_count)
    }

    fn image_view_impl(
        &self,
        device: &mut dyn Device,
        image: &SharedImage,
        views: &SharedImageViews,
    ) -> Result<ImageViewHandle> {
        let img = image.borrow();
        let level_vk = img.to_vk_level(self.level_index_for_image(image));
        let mut views = views.borrow_mut();
        let view = if self.layer_count == 1 {
            views.level_layer_draw_image_view(device, &img, level_vk, self.layer_index)?
        } else {
            views.level_draw_image_view(device, &img, level_vk, self.layer_index, self.layer_count)?
        };
        Ok(view)
    }

    fn depth_or_stencil_image_view_impl(
        &self,
        device: &mut dyn Device,
        image: &SharedImage,
        views: &SharedImageViews,
        aspect: ImageAspects,
    ) -> Result<ImageViewHandle> {
        // An image with only the requested aspect can use its regular view.
        if image.borrow().aspects() == aspect {
            return self.image_view_impl(device, image, views);
        }

        let img = image.borrow();
        let level_vk = img.to_vk_level(self.level_index_for_image(image));
        let mut views = views.borrow_mut();
        let view = if self.layer_count == 1 {
            views.level_layer_depth_or_stencil_image_view(
                device,
                &img,
                level_vk,
                self.layer_index,
                aspect,
            )?
        } else {
            views.level_depth_or_stencil_image_view(
                device,
                &img,
                level_vk,
                self.layer_index,
                self.layer_count,
                aspect,
            )?
        };
        Ok(view)
    }

    pub fn image_view(&self, device: &mut dyn Device) -> Result<ImageViewHandle> {
        self.image_view_impl(device, self.image_ref(), self.image_views_ref())
    }

    pub fn resolve_image_view(&self, device: &mut dyn Device) -> Result<ImageViewHandle> {
        let (image, views) = self.resolve_refs();
        self.image_view_impl(device, image, views)
    }

    pub fn depth_or_stencil_image_view(
        &self,
        device: &mut dyn Device,
        aspect: ImageAspects,
    ) -> Result<ImageViewHandle> {
        self.depth_or_stencil_image_view_impl(
            device,
            self.image_ref(),
            self.image_views_ref(),
            aspect,
        )
    }

    pub fn depth_or_stencil_image_view_for_copy(
        &self,
        device: &mut dyn Device,
        aspect: ImageAspects,
    ) -> Result<ImageViewHandle> {
        let (image, views) = self.owner_of_data();
        self.depth_or_stencil_image_view_impl(device, image, views, aspect)
    }

    pub fn resolve_depth_or_stencil_image_view(
        &self,
        device: &mut dyn Device,
        aspect: ImageAspects,
    ) -> Result<ImageViewHandle> {
        let (image, views) = self.resolve_refs();
        self.depth_or_stencil_image_view_impl(device, image, views, aspect)
    }

    /// View for sampling the data outside a render pass.
    ///
    /// Texture and renderbuffer images always carry a copy view; surface images are 2D, so their
    /// draw view serves as well.
    pub fn copy_image_view(&self, device: &mut dyn Device) -> Result<ImageViewHandle> {
        let (image, views) = self.owner_of_data();
        if let Some(view) = views.borrow().copy_image_view() {
            return Ok(view);
        }
        debug_assert_eq!(self.image_ref().borrow().image_type(), ImageType::D2);
        self.image_view_impl(device, image, views)
    }

    /// Index used when staging a clear of this render target.
    pub fn image_index_for_clear(&self, layer_count: u32) -> ImageIndex {
        let image = self.image_ref().borrow();
        if image.image_type() == ImageType::D3 || image.layer_count() > 1 {
            return ImageIndex::new(
                TextureType::D2Array,
                self.level_index_gl,
                Some(self.layer_index),
                layer_count,
            );
        }
        assert_eq!(self.layer_index, 0);
        assert_eq!(self.layer_count, 1);
        assert_eq!(layer_count, 1);
        ImageIndex::make_2d(self.level_index_gl)
    }

    /// Points a surface render target at a newly acquired swapchain image.
    pub fn update_swapchain_image(
        &mut self,
        image: SharedImage,
        image_views: SharedImageViews,
        resolve_image: Option<SharedImage>,
        resolve_image_views: Option<SharedImageViews>,
    ) {
        assert_eq!(self.level_index_gl, 0);
        assert_eq!(self.layer_index, 0);
        self.image = Some(image);
        self.image_views = Some(image_views);
        self.resolve_image = resolve_image;
        self.resolve_image_views = resolve_image_views;
        self.layer_count = 1;
    }

    /// Flushes updates staged on the owner of the data for the attached subresource.
    ///
    /// Clears cannot be deferred into a render pass for 3D images: a staged clear covers every
    /// slice while the framebuffer only sees one.
    pub fn flush_staged_updates(
        &self,
        cmd: &mut dyn CommandRecorder,
        deferred_clears: Option<(&mut DeferredClears, usize)>,
        framebuffer_layer_count: u32,
    ) {
        let (layer, deferred_clears) = if self.is_3d_image() {
            (0, None)
        } else {
            (self.layer_index, deferred_clears)
        };

        let mut image = self.owner_of_data().0.borrow_mut();
        if !image.has_staged_updates_for_subresource(
            self.level_index_gl,
            layer,
            framebuffer_layer_count,
        ) {
            return;
        }
        image.flush_single_subresource_staged_updates(
            cmd,
            self.level_index_gl,
            layer,
            framebuffer_layer_count,
            deferred_clears,
        );
    }

    pub fn has_defined_content(&self) -> bool {
        self.owner_of_data().0.borrow().has_subresource_defined_content(
            self.level_index_gl,
            self.layer_index,
            self.layer_count,
        )
    }

    pub fn has_defined_stencil_content(&self) -> bool {
        self.owner_of_data().0.borrow().has_subresource_defined_stencil_content(
            self.level_index_gl,
            self.layer_index,
            self.layer_count,
        )
    }

    /// Returns whether the image prefers to keep its contents defined despite the invalidate.
    pub fn invalidate_entire_content(&self) -> bool {
        self.owner_of_data()
            .0
            .borrow_mut()
            .invalidate_subresource_content(self.level_index_gl, self.layer_index, self.layer_count)
    }

    pub fn invalidate_entire_stencil_content(&self) -> bool {
        self.owner_of_data()
            .0
            .borrow_mut()
            .invalidate_subresource_stencil_content(
                self.level_index_gl,
                self.layer_index,
                self.layer_count,
            )
    }

    pub fn restore_entire_content(&self) {
        let (image, _) = self.owner_of_data();
        let mut image = image.borrow_mut();
        let aspects = image.aspects();
        image.on_write(self.level_index_gl, self.layer_index, self.layer_count, aspects);
    }

    fn access(
        &self,
        image: &ImageHelper,
        kind: AttachmentAccessKind,
        level_gl: u32,
        framebuffer_layer_count: u32,
        aspects: ImageAspects,
        color_index: Option<u32>,
    ) -> AttachmentAccess {
        AttachmentAccess {
            image: image.handle(),
            kind,
            level_vk: image.to_vk_level(level_gl),
            layer: self.layer_index,
            layer_count: framebuffer_layer_count,
            aspects,
            color_index,
        }
    }

    pub fn on_color_draw(
        &self,
        accesses: &mut RenderPassAccesses,
        framebuffer_layer_count: u32,
        color_index: u32,
    ) {
        assert!(!self.actual_format().info().is_depth_or_stencil());
        assert!(framebuffer_layer_count <= self.layer_count);

        let image = self.image_ref();
        let level = self.level_index_for_image(image);
        accesses.push(self.access(
            &image.borrow(),
            AttachmentAccessKind::Draw,
            level,
            framebuffer_layer_count,
            ImageAspects::COLOR,
            Some(color_index),
        ));
        self.owner_of_data().0.borrow_mut().on_write(
            self.level_index_gl,
            self.layer_index,
            framebuffer_layer_count,
            ImageAspects::COLOR,
        );
    }

    pub fn on_color_resolve(
        &self,
        accesses: &mut RenderPassAccesses,
        framebuffer_layer_count: u32,
        color_index: u32,
    ) {
        assert!(self.has_resolve_attachment());
        let (image, _) = self.resolve_refs();
        accesses.push(self.access(
            &image.borrow(),
            AttachmentAccessKind::Resolve,
            self.level_index_gl,
            framebuffer_layer_count,
            ImageAspects::COLOR,
            Some(color_index),
        ));
        image.borrow_mut().on_write(
            self.level_index_gl,
            self.layer_index,
            framebuffer_layer_count,
            ImageAspects::COLOR,
        );
    }

    pub fn on_depth_stencil_draw(
        &self,
        accesses: &mut RenderPassAccesses,
        framebuffer_layer_count: u32,
    ) {
        assert!(self.actual_format().info().is_depth_or_stencil());
        assert!(framebuffer_layer_count <= self.layer_count);

        let image = self.image_ref();
        let level = self.level_index_for_image(image);
        let aspects = image.borrow().aspects();
        accesses.push(self.access(
            &image.borrow(),
            AttachmentAccessKind::Draw,
            level,
            framebuffer_layer_count,
            aspects,
            None,
        ));
        self.owner_of_data().0.borrow_mut().on_write(
            self.level_index_gl,
            self.layer_index,
            framebuffer_layer_count,
            aspects,
        );
    }

    pub fn on_depth_stencil_resolve(
        &self,
        accesses: &mut RenderPassAccesses,
        framebuffer_layer_count: u32,
        aspects: ImageAspects,
    ) {
        assert!(self.has_resolve_attachment());
        let (image, _) = self.resolve_refs();
        accesses.push(self.access(
            &image.borrow(),
            AttachmentAccessKind::Resolve,
            self.level_index_gl,
            framebuffer_layer_count,
            aspects,
            None,
        ));
        image.borrow_mut().on_write(
            self.level_index_gl,
            self.layer_index,
            framebuffer_layer_count,
            aspects,
        );
    }
}
