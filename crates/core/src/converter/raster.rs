//! Raster image adapters.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use lopdf::{dictionary, Document, Object, Stream};

use super::adapter::Converted;
use super::document::PDF_MIME;
use super::error::AdapterError;

/// Raster formats that convert into each other.
pub const RASTER_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "gif"];

/// Re-encodes an image into the format named by `target_hint`.
pub fn convert_raster(content: &[u8], target_hint: &str) -> Result<Converted, AdapterError> {
    let format = ImageFormat::from_extension(target_hint)
        .ok_or_else(|| AdapterError::encode(target_hint, "unsupported image format"))?;

    let img = image::load_from_memory(content)
        .map_err(|e| AdapterError::decode("image", format!("Failed to load image: {}", e)))?;

    // JPEG has no alpha channel; everything else takes RGBA.
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => DynamicImage::ImageRgba8(img.to_rgba8()),
    };

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format)
        .map_err(|e| AdapterError::encode(target_hint, e))?;

    let mime = mime_guess::from_ext(target_hint).first_or_octet_stream();
    Ok(Converted::new(buf.into_inner(), mime.essence_str()))
}

/// Embeds an image as a single centered page on US Letter.
pub fn image_to_pdf(content: &[u8], _hint: &str) -> Result<Converted, AdapterError> {
    let img = image::load_from_memory(content)
        .map_err(|e| AdapterError::decode("image", format!("Failed to load image: {}", e)))?;

    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let resources_id = doc.new_object_id();
    let content_id = doc.new_object_id();
    let page_id = doc.new_object_id();
    let image_id = doc.new_object_id();

    let image_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    );
    doc.objects.insert(image_id, Object::Stream(image_stream));

    doc.objects.insert(
        resources_id,
        Object::Dictionary(dictionary! {
            "XObject" => dictionary! {
                "Im1" => image_id,
            },
        }),
    );

    let page_width = 612.0_f64;
    let page_height = 792.0_f64;
    let margin = 36.0_f64;

    let scale = ((page_width - 2.0 * margin) / width as f64)
        .min((page_height - 2.0 * margin) / height as f64);
    let img_width = (width as f64 * scale) as i64;
    let img_height = (height as f64 * scale) as i64;
    let x = ((page_width - img_width as f64) / 2.0) as i64;
    let y = ((page_height - img_height as f64) / 2.0) as i64;

    let draw = format!(
        "q\n{} 0 0 {} {} {} cm\n/Im1 Do\nQ\n",
        img_width, img_height, x, y
    );
    doc.objects.insert(
        content_id,
        Object::Stream(Stream::new(dictionary! {}, draw.into_bytes())),
    );

    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        }),
    );

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AdapterError::encode("pdf", e))?;

    Ok(Converted::new(buffer, PDF_MIME))
}
