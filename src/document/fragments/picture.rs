//! Inline picture (`wp:inline` drawing) fragments

use std::path::{Path, PathBuf};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::opc::rel_types;
use crate::xml::namespace::PIC;
use crate::xml::{ElementFactory, XmlElement};

/// English Metric Units per screen pixel
pub const EMU_PER_PIXEL: u64 = 12667;

/// Sizing and locking of an inline picture
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PictureOptions {
    /// Pixel (width, height); read from the file when `None`
    pub pixel_size: Option<(u32, u32)>,
    pub no_change_aspect: bool,
    pub no_change_arrowheads: bool,
}

impl Default for PictureOptions {
    fn default() -> Self {
        Self {
            pixel_size: None,
            no_change_aspect: true,
            no_change_arrowheads: true,
        }
    }
}

impl PictureOptions {
    pub fn pixel_size(mut self, width: u32, height: u32) -> Self {
        self.pixel_size = Some((width, height));
        self
    }
}

/// Build a paragraph holding the picture at `path`.
///
/// Adds an image relationship to `media/<file name>` and queues the file
/// to be copied into the package on save.
pub fn picture(
    document: &mut Document,
    path: impl AsRef<Path>,
    description: &str,
    options: PictureOptions,
) -> Result<XmlElement> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| unreadable(path, "path has no file name"))?;

    let (width, height) = match options.pixel_size {
        Some(size) => size,
        None => image::image_dimensions(path).map_err(|e| unreadable(path, e))?,
    };
    let cx = (u64::from(width) * EMU_PER_PIXEL).to_string();
    let cy = (u64::from(height) * EMU_PER_PIXEL).to_string();

    let relationships = document.relationships_mut();
    let rel_id = relationships.append(rel_types::IMAGE, &format!("media/{name}"));
    relationships.record_media_copy(&name, path);
    let doc_pr_id = rel_id.trim_start_matches("rId").to_string();
    log::debug!("picture {} as {} ({}x{} px)", name, rel_id, width, height);

    let factory = document.factory();
    let pic = pic_element(&factory, &name, &rel_id, &cx, &cy, &options)?;

    let inline = factory
        .element_with_attrs(
            "wp:inline",
            &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
        )?
        .with_child(
            factory.element_with_attrs("wp:extent", &[("cx", cx.as_str()), ("cy", cy.as_str())])?,
        )
        .with_child(factory.element_with_attrs(
            "wp:effectExtent",
            &[("l", "25400"), ("t", "0"), ("r", "0"), ("b", "0")],
        )?)
        .with_child(factory.element_with_attrs(
            "wp:docPr",
            &[("id", doc_pr_id.as_str()), ("name", "Picture 1"), ("descr", description)],
        )?)
        .with_child(
            factory.element("wp:cNvGraphicFramePr")?.with_child(
                factory.element_with_attrs("a:graphicFrameLocks", &[("noChangeAspect", "1")])?,
            ),
        )
        .with_child(
            factory.element("a:graphic")?.with_child(
                factory
                    .element_with_attrs("a:graphicData", &[("uri", PIC)])?
                    .with_child(pic),
            ),
        );

    Ok(factory.element("w:p")?.with_child(
        factory
            .element("w:r")?
            .with_child(factory.element("w:drawing")?.with_child(inline)),
    ))
}

fn pic_element(
    factory: &ElementFactory<'_>,
    name: &str,
    rel_id: &str,
    cx: &str,
    cy: &str,
    options: &PictureOptions,
) -> Result<XmlElement> {
    let flag = |on: bool| if on { "1" } else { "0" };

    let non_visual = factory
        .element("pic:nvPicPr")?
        .with_child(factory.element_with_attrs(
            "pic:cNvPr",
            &[("id", "0"), ("name", "Picture 1"), ("descr", name)],
        )?)
        .with_child(factory.element("pic:cNvPicPr")?.with_child(factory.element_with_attrs(
            "a:picLocks",
            &[
                ("noChangeAspect", flag(options.no_change_aspect)),
                ("noChangeArrowheads", flag(options.no_change_arrowheads)),
            ],
        )?));

    let blip_fill = factory
        .element("pic:blipFill")?
        .with_child(factory.element_with_attrs("a:blip", &[("r:embed", rel_id)])?)
        .with_child(factory.element("a:srcRect")?)
        .with_child(factory.element("a:stretch")?.with_child(factory.element("a:fillRect")?));

    let shape = factory
        .element_with_attrs("pic:spPr", &[("bwMode", "auto")])?
        .with_child(
            factory
                .element("a:xfrm")?
                .with_child(factory.element_with_attrs("a:off", &[("x", "0"), ("y", "0")])?)
                .with_child(factory.element_with_attrs("a:ext", &[("cx", cx), ("cy", cy)])?),
        )
        .with_child(
            factory
                .element_with_attrs("a:prstGeom", &[("prst", "rect")])?
                .with_child(factory.element("a:avLst")?),
        );

    Ok(factory
        .element("pic:pic")?
        .with_child(non_visual)
        .with_child(blip_fill)
        .with_child(shape))
}

fn unreadable(path: &Path, reason: impl std::fmt::Display) -> Error {
    Error::MediaSourceUnreadable {
        path: PathBuf::from(path),
        reason: reason.to_string(),
    }
}
