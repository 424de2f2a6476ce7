use image::{DynamicImage, ImageFormat, RgbaImage};
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::{path::Path, str::FromStr};

#[derive(Debug, Snafu)]
pub enum RasterError {
    #[snafu(display("`{path}` does not exist"))]
    NotFound { path: String },
    #[snafu(display("Could not open `{path}`"))]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("Could not decode `{path}`"))]
    Decode {
        path: String,
        source: image::ImageError,
    },
    #[snafu(display("{width}x{height} pixels do not fit in {len} samples"))]
    SampleCount { width: u32, height: u32, len: usize },
    #[snafu(display("Could not write `{path}`"))]
    Write {
        path: String,
        source: image::ImageError,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum Format {
    Png,
    Jpg,
    Bmp,
    Tiff,
}

impl Format {
    fn image_format(self) -> ImageFormat {
        match self {
            Format::Png => ImageFormat::Png,
            Format::Jpg => ImageFormat::Jpeg,
            Format::Bmp => ImageFormat::Bmp,
            Format::Tiff => ImageFormat::Tiff,
        }
    }
}

impl FromStr for Format {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(format) = s.eq_ignore_ascii_case("png").then_some(Format::Png)
               .or_else(|| s.eq_ignore_ascii_case("jpg").then_some(Format::Jpg))
               .or_else(|| s.eq_ignore_ascii_case("jpeg").then_some(Format::Jpg))
               .or_else(|| s.eq_ignore_ascii_case("bmp").then_some(Format::Bmp))
               .or_else(|| s.eq_ignore_ascii_case("tiff").then_some(Format::Tiff))
        else { return Err("expected one of png, jpg, bmp, tiff"); };

        Ok(format)
    }
}

/// Reads a whole input file, reporting a missing file as [`RasterError::NotFound`].
pub fn read_input(path: &str) -> Result<Vec<u8>, RasterError> {
    ensure!(Path::new(path).exists(), NotFoundSnafu { path });
    std::fs::read(path).context(OpenSnafu { path })
}

/// Pixels loaded from a raster file, row-major with 3 or 4 samples per pixel.
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub samples: Vec<u8>,
}

/// Loads a raster image. Images with an alpha channel come back as RGBA, all others as RGB.
///
/// Without a `format`, it is guessed from the file contents.
pub fn load_raster(path: &str, format: Option<Format>) -> Result<Raster, RasterError> {
    ensure!(Path::new(path).exists(), NotFoundSnafu { path });

    let mut reader = image::io::Reader::open(path).context(OpenSnafu { path })?;
    match format {
        Some(format) => reader.set_format(format.image_format()),
        None => reader = reader.with_guessed_format().context(OpenSnafu { path })?,
    }
    let image = reader.decode().context(DecodeSnafu { path })?;

    let (width, height) = (image.width(), image.height());
    let raster = if image.color().has_alpha() {
        Raster {
            width,
            height,
            channels: 4,
            samples: image.into_rgba8().into_raw(),
        }
    } else {
        Raster {
            width,
            height,
            channels: 3,
            samples: image.into_rgb8().into_raw(),
        }
    };

    Ok(raster)
}

/// Saves row-major RGBA samples. Formats without alpha support drop the alpha channel.
pub fn save_raster(
    path: &str,
    width: u32,
    height: u32,
    samples: Vec<u8>,
    format: Format,
) -> Result<(), RasterError> {
    let len = samples.len();
    let image = RgbaImage::from_raw(width, height, samples).context(SampleCountSnafu {
        width,
        height,
        len,
    })?;

    let image = match format {
        Format::Jpg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image).into_rgb8()),
        _ => DynamicImage::ImageRgba8(image),
    };

    image
        .save_with_format(path, format.image_format())
        .context(WriteSnafu { path })
}
