use homework_helper_core::{
    capture::{ImageOrigin, ScreenCapturer, acquire},
    chat::ChatSession,
    config::Config,
    crop::{CropRect, centered_crop},
    encode::encode_image,
    gemini::GeminiClient,
    image_processing::{ImageProcessor, RasterRequest},
    init, markdown, HomeworkHelper,
};
use anyhow::{Context, Result};
use arboard::Clipboard;
use clap::{ArgGroup, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use termimad::MadSkin;
use termimad::crossterm::style::Color;

#[derive(Parser, Debug)]
#[command(author, version, about = "Step-by-step homework answers from Gemini", long_about = None)]
#[command(group(ArgGroup::new("origin").args(["image", "capture"])))]
struct Args {
    /// The homework question
    #[arg(trailing_var_arg = true)]
    question: Vec<String>,

    /// Photo of the problem
    #[arg(short, long, conflicts_with = "capture")]
    image: Option<PathBuf>,

    /// Capture the screen instead of reading a file
    #[arg(long)]
    capture: bool,

    /// Select which monitor to capture
    #[arg(long, default_value_t = 0)]
    monitor: usize,

    /// Crop region in image pixels: X,Y,WIDTH,HEIGHT
    #[arg(long, value_parser = parse_crop, conflicts_with = "aspect", requires = "origin")]
    crop: Option<CropRect>,

    /// Send the centered 90% crop with this aspect ratio (e.g. 4:3, 1.5, free)
    #[arg(long, value_parser = parse_aspect, requires = "origin")]
    aspect: Option<Aspect>,

    /// Override the model defined in .env
    #[arg(short, long)]
    model: Option<String>,

    /// Copy the answer to the clipboard
    #[arg(short, long, default_value_t = false)]
    copy: bool,

    /// Print the answer as HTML instead of terminal markdown
    #[arg(long)]
    html: bool,

    /// Open the desktop window instead of answering in the terminal
    #[arg(long)]
    gui: bool,

    /// List available monitors and exit
    #[arg(long)]
    list_monitors: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init();
    env_logger::init();
    let args = Args::parse();

    if args.list_monitors {
        let capturer = ScreenCapturer::new().context("Failed to initialize screen capturer")?;
        println!("Available monitors:");
        for info in capturer.list_screen() {
            println!("{}", info);
        }
        return Ok(());
    }

    // Load config and override model if specified via CLI
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(m) = args.model.clone() {
        config.model_name = m;
    }

    let origin = match (&args.image, args.capture) {
        (Some(path), _) => Some(ImageOrigin::File(path.clone())),
        (None, true) => Some(ImageOrigin::Screen(args.monitor)),
        (None, false) => None,
    };

    let source = origin
        .as_ref()
        .map(acquire)
        .transpose()
        .context("Failed to read the image. Try using --list-monitors to check indices")?;

    if args.gui {
        HomeworkHelper::with_config(config).run_interactive(source)?;
        return Ok(());
    }

    let image = match &source {
        Some(source) => {
            let selection = match (args.crop, args.aspect) {
                (Some(crop), _) => Some(crop),
                (None, Some(Aspect(ratio))) => Some(centered_crop(source.width(), source.height(), ratio)),
                (None, None) => None,
            };
            let request = RasterRequest::natural(source, selection);
            let cropped = ImageProcessor::rasterize(source, &request).context("Failed to crop the image")?;
            log::info!("sending {}x{} crop", cropped.width(), cropped.height());
            Some(encode_image(&cropped).context("Failed to encode the image")?)
        }
        None => None,
    };

    // If the question was empty and there is no image, ask now
    let mut question = args.question.join(" ");
    if question.trim().is_empty() && image.is_none() {
        print!("Enter your question: ");
        io::stdout().flush()?;
        io::stdin().read_line(&mut question)?;
    }

    let client = GeminiClient::new(&config).context("Failed to create Gemini client")?;
    let mut session = ChatSession::new();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.green} {msg}")?,
    );
    spinner.set_message(format!("Solving with {}...", config.model_name));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let answer = session.ask(&client, &config, &question, image).await.cloned();

    spinner.finish_and_clear();

    let Some(answer) = answer else {
        eprintln!("Nothing to ask: provide a question or an image.");
        return Ok(());
    };

    if answer.is_error {
        anyhow::bail!("{}", answer.text);
    }

    if args.html {
        println!("{}", markdown::render_html(&answer.text));
    } else {
        print_markdown(&answer.text);
    }

    if args.copy {
        match Clipboard::new() {
            Ok(mut clipboard) => {
                if let Err(e) = clipboard.set_text(markdown::to_plain_text(&answer.text)) {
                    log::warn!("Failed to copy to clipboard: {}", e);
                } else {
                    println!("(Copied to clipboard)");
                }
            }
            Err(e) => log::warn!("Could not access clipboard: {}", e),
        }
    }

    Ok(())
}

/// Parses `X,Y,WIDTH,HEIGHT` in pixels.
fn parse_crop(raw: &str) -> std::result::Result<CropRect, String> {
    let values = raw
        .split(',')
        .map(|v| v.trim().parse::<f32>().map_err(|_| format!("`{}` is not a number", v.trim())))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [x, y, w, h] if *w > 0.0 && *h > 0.0 => Ok(CropRect::pixels(*x, *y, *w, *h)),
        [_, _, _, _] => Err("crop width and height must be positive".to_string()),
        _ => Err("expected X,Y,WIDTH,HEIGHT".to_string()),
    }
}

/// Width-to-height ratio from `--aspect`, `None` for freeform.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Aspect(Option<f32>);

/// Parses `W:H`, a plain ratio, or `free`.
fn parse_aspect(raw: &str) -> std::result::Result<Aspect, String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("free") {
        return Ok(Aspect(None));
    }

    let ratio = match raw.split_once(':') {
        Some((w, h)) => {
            let w: f32 = w.trim().parse().map_err(|_| format!("bad aspect width `{w}`"))?;
            let h: f32 = h.trim().parse().map_err(|_| format!("bad aspect height `{h}`"))?;
            w / h
        }
        None => raw.parse().map_err(|_| format!("bad aspect ratio `{raw}`"))?,
    };

    if ratio.is_finite() && ratio > 0.0 {
        Ok(Aspect(Some(ratio)))
    } else {
        Err(format!("aspect ratio must be positive, got `{raw}`"))
    }
}

/// Helper to print markdown
fn print_markdown(text: &str) {
    let mut skin = MadSkin::default();
    skin.bold.set_fg(Color::Yellow);
    skin.italic.set_fg(Color::Magenta);
    skin.inline_code.set_bg(Color::Rgb { r: 40, g: 40, b: 40 });

    skin.print_text(text);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_argument() {
        assert_eq!(parse_crop("100, 100,400,300"), Ok(CropRect::pixels(100.0, 100.0, 400.0, 300.0)));
        assert!(parse_crop("1,2,3").is_err());
        assert!(parse_crop("1,2,0,4").is_err());
        assert!(parse_crop("a,2,3,4").is_err());
    }

    #[test]
    fn aspect_argument() {
        assert_eq!(parse_aspect("free"), Ok(Aspect(None)));
        assert_eq!(parse_aspect("4:2"), Ok(Aspect(Some(2.0))));
        assert_eq!(parse_aspect("1.5"), Ok(Aspect(Some(1.5))));
        assert!(parse_aspect("1:0").is_err());
        assert!(parse_aspect("wide").is_err());
    }

    #[test]
    fn args_parse() {
        let args = Args::try_parse_from([
            "homework-helper",
            "--image",
            "worksheet.png",
            "--crop",
            "10,10,50,50",
            "solve",
            "for",
            "x",
        ])
        .unwrap();
        assert_eq!(args.question.join(" "), "solve for x");
        assert_eq!(args.crop, Some(CropRect::pixels(10.0, 10.0, 50.0, 50.0)));

        assert!(Args::try_parse_from(["homework-helper", "--image", "a.png", "--capture"]).is_err());
    }

    #[test]
    fn crop_flags_need_an_image() {
        assert!(Args::try_parse_from(["homework-helper", "--crop", "1,2,3,4", "what"]).is_err());
        assert!(Args::try_parse_from(["homework-helper", "--aspect", "4:3"]).is_err());

        let args = Args::try_parse_from(["homework-helper", "--capture", "--aspect", "4:3"]).unwrap();
        assert_eq!(args.aspect, Some(Aspect(Some(4.0 / 3.0))));
    }
}
