//! Named regions over one backing texture.
//!
//! Parsing atlas description files is left to the caller; regions are added
//! one by one and every lookup yields a fresh [`SubTexture`](super::texture::SubTexture)
//! view.

use std::collections::BTreeMap;
use std::rc::Rc;

use super::texture::Texture;
use crate::rect::Rect;

/// Placement of one named region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasRegion {
    /// Area inside the atlas texture, in points
    pub region: Rect,
    /// Untrimmed frame around the region, if the image was trimmed
    pub frame: Option<Rect>,
    /// Stored rotated by 90° inside the atlas
    pub rotated: bool,
}

pub struct TextureAtlas {
    texture: Rc<Texture>,
    regions: BTreeMap<String, AtlasRegion>,
}

impl TextureAtlas {
    pub fn new(texture: Rc<Texture>) -> Self {
        Self {
            texture,
            regions: BTreeMap::new(),
        }
    }

    pub fn texture(&self) -> &Rc<Texture> {
        &self.texture
    }

    pub fn add_region(
        &mut self,
        name: impl Into<String>,
        region: Rect,
        frame: Option<Rect>,
        rotated: bool,
    ) {
        self.regions.insert(
            name.into(),
            AtlasRegion {
                region,
                frame,
                rotated,
            },
        );
    }

    pub fn remove_region(&mut self, name: &str) -> Option<AtlasRegion> {
        self.regions.remove(name)
    }

    pub fn region(&self, name: &str) -> Option<Rect> {
        self.regions.get(name).map(|entry| entry.region)
    }

    pub fn frame(&self, name: &str) -> Option<Rect> {
        self.regions.get(name).and_then(|entry| entry.frame)
    }

    /// A view of the named region, or `None` for unknown names.
    pub fn get(&self, name: &str) -> Option<Rc<Texture>> {
        self.regions.get(name).map(|entry| self.view(entry))
    }

    /// Views of all regions whose name starts with `prefix`, sorted by name.
    pub fn textures_with_prefix(&self, prefix: &str) -> Vec<Rc<Texture>> {
        self.regions
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(_, entry)| self.view(entry))
            .collect()
    }

    /// Region names starting with `prefix`, sorted.
    pub fn names(&self, prefix: &str) -> Vec<&str> {
        self.regions
            .keys()
            .filter(|name| name.starts_with(prefix))
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    fn view(&self, entry: &AtlasRegion) -> Rc<Texture> {
        Texture::sub(&self.texture, Some(entry.region), entry.frame, entry.rotated, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::context::RenderContext;
    use crate::renderer::texture::TextureOptions;

    fn atlas() -> TextureAtlas {
        let context = RenderContext::new(Default::default());
        let texture = Texture::empty(&context, 128, 64, TextureOptions::default()).unwrap();
        let mut atlas = TextureAtlas::new(texture);
        atlas.add_region("walk_02", Rect::new(32.0, 0.0, 32.0, 32.0), None, false);
        atlas.add_region("walk_01", Rect::new(0.0, 0.0, 32.0, 32.0), None, false);
        atlas.add_region("jump", Rect::new(64.0, 0.0, 16.0, 48.0), None, true);
        atlas.add_region(
            "coin",
            Rect::new(96.0, 0.0, 12.0, 12.0),
            Some(Rect::new(-2.0, -2.0, 16.0, 16.0)),
            false,
        );
        atlas
    }

    #[test]
    fn test_lookup() {
        let atlas = atlas();
        assert_eq!(atlas.len(), 4);
        assert!(atlas.get("missing").is_none());

        let jump = atlas.get("jump").unwrap();
        assert_eq!(jump.width(), 48.0);
        assert_eq!(jump.height(), 16.0);
        assert_eq!(jump.root_id(), atlas.texture().root_id());

        let coin = atlas.get("coin").unwrap();
        assert_eq!(coin.frame(), Some(Rect::new(-2.0, -2.0, 16.0, 16.0)));
        assert_eq!(atlas.frame("walk_01"), None);
    }

    #[test]
    fn test_prefix_lookup_is_sorted() {
        let atlas = atlas();
        assert_eq!(atlas.names("walk"), vec!["walk_01", "walk_02"]);

        let frames = atlas.textures_with_prefix("walk");
        assert_eq!(frames.len(), 2);
        let (u, _) = frames[1].local_to_global(0.0, 0.0);
        assert_eq!(u, 0.25);
    }

    #[test]
    fn test_remove_region() {
        let mut atlas = atlas();
        assert!(atlas.remove_region("coin").is_some());
        assert!(atlas.get("coin").is_none());
        assert!(atlas.remove_region("coin").is_none());
    }
}
