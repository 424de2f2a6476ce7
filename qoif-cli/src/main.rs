use argh::FromArgs;
use qoif::{Channels, Colorspace, Header};
use raster::{load_raster, read_input, save_raster, Format};
use std::str::FromStr;

mod raster;

/// QOI cli encoder and decoder.
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Encode(Encode),
    Decode(Decode),
    Info(Info),
}

/// Encodes an image as QOI.
#[derive(FromArgs)]
#[argh(subcommand, name = "encode")]
struct Encode {
    /// colorspace tag written to the header (srgb, linear), defaults to srgb
    #[argh(option, default = "ColorspaceArg::Srgb")]
    colorspace: ColorspaceArg,

    /// input format, optional (png, jpg, bmp, tiff)
    #[argh(option)]
    format: Option<Format>,

    /// the input file. Without --format, this may be a PNG, JPG, BMP, or TIFF.
    #[argh(positional)]
    input: String,
    /// the output file
    #[argh(positional)]
    output: String,
}

/// Decodes a QOI image.
#[derive(FromArgs)]
#[argh(subcommand, name = "decode")]
struct Decode {
    /// output format (png, jpg, bmp, tiff), defaults to png
    #[argh(option, default = "Format::Png")]
    format: Format,

    /// the input file
    #[argh(positional)]
    input: String,
    /// the output file
    #[argh(positional)]
    output: String,
}

/// Prints the header of a QOI image.
#[derive(FromArgs)]
#[argh(subcommand, name = "info")]
struct Info {
    /// the input file
    #[argh(positional)]
    input: String,
}

#[derive(Debug, Clone, Copy)]
enum ColorspaceArg {
    Srgb,
    Linear,
}

impl FromStr for ColorspaceArg {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(colorspace) = s.eq_ignore_ascii_case("srgb").then_some(ColorspaceArg::Srgb)
               .or_else(|| s.eq_ignore_ascii_case("linear").then_some(ColorspaceArg::Linear))
        else { return Err("expected srgb or linear"); };

        Ok(colorspace)
    }
}

impl From<ColorspaceArg> for Colorspace {
    fn from(arg: ColorspaceArg) -> Self {
        match arg {
            ColorspaceArg::Srgb => Colorspace::Srgb,
            ColorspaceArg::Linear => Colorspace::Linear,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli { command } = argh::from_env();

    match command {
        Command::Encode(options) => encode(options),
        Command::Decode(options) => decode(options),
        Command::Info(options) => info(options),
    }
}

fn encode(options: Encode) -> Result<(), Box<dyn std::error::Error>> {
    let Encode {
        colorspace,
        format,
        input,
        output,
    } = options;

    let raster = load_raster(&input, format)?;
    let channels = if raster.channels == 4 {
        Channels::Rgba
    } else {
        Channels::Rgb
    };

    println!(
        "Encoding {}x{} image with {} channels",
        raster.width, raster.height, raster.channels
    );

    let header = Header::new(raster.width, raster.height, channels, colorspace.into());
    let encoded = qoif::encode_to_vec(&header, &raster.samples)?;

    std::fs::write(&output, &encoded)?;
    println!("Written {} bytes to `{output}`", encoded.len());

    Ok(())
}

fn decode(options: Decode) -> Result<(), Box<dyn std::error::Error>> {
    let Decode {
        format,
        input,
        output,
    } = options;

    let qoi_input = read_input(&input)?;

    println!("Decoding `{input}`");

    let qoif::Decoded {
        header,
        mut pixels,
        warnings,
    } = qoif::decode_to_vec(&qoi_input)?;
    let Header { width, height, .. } = header;

    // the library already logged every warning
    if !warnings.is_empty() && pad_missing_pixels(&mut pixels, width, height) {
        log::warn!("`{input}` is incomplete, missing pixels are filled with transparent black");
    }

    save_raster(&output, width, height, pixels, format)?;

    println!("Written {width}x{height} image to `{output}`");

    Ok(())
}

/// Fills an underfilled decode up to `width * height` pixels. Returns whether anything was added.
fn pad_missing_pixels(pixels: &mut Vec<u8>, width: u32, height: u32) -> bool {
    // decode_to_vec succeeded, so the full size fits in memory
    let len = width as usize * height as usize * 4;
    if pixels.len() >= len {
        return false;
    }
    pixels.resize(len, 0);
    true
}

fn info(options: Info) -> Result<(), Box<dyn std::error::Error>> {
    let qoi_input = read_input(&options.input)?;
    let (header, body) = qoif::read_header(&qoi_input)?;

    let channels = header
        .channels()
        .map_or_else(|| format!("unknown ({})", header.channels), |c| format!("{c:?}"));
    let colorspace = header
        .colorspace()
        .map_or_else(|| format!("unknown ({})", header.colorspace), |c| format!("{c:?}"));

    println!(
        "QOI w:{} h:{} channels:{channels} color:{colorspace}",
        header.width, header.height
    );
    println!("{} bytes of chunk data", body.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_decodes_are_not_padded() {
        let mut pixels = vec![7; 2 * 2 * 4];
        assert!(!pad_missing_pixels(&mut pixels, 2, 2));
        assert_eq!(pixels, [7; 16]);
    }

    #[test]
    fn underfilled_decodes_get_transparent_black() {
        let mut pixels = vec![7; 4];
        assert!(pad_missing_pixels(&mut pixels, 2, 1));
        assert_eq!(pixels, [7, 7, 7, 7, 0, 0, 0, 0]);
    }

    #[test]
    fn parses_colorspace() {
        assert!(matches!("sRGB".parse::<ColorspaceArg>(), Ok(ColorspaceArg::Srgb)));
        assert!(matches!("linear".parse::<ColorspaceArg>(), Ok(ColorspaceArg::Linear)));
        assert!("p3".parse::<ColorspaceArg>().is_err());
    }
}
