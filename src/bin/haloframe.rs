use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "haloframe", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a framed profile picture as a PNG.
    Render(RenderArgs),
    /// List the built-in themes.
    Themes,
    /// Print the share URL for a theme, optionally copying an image first.
    Share(ShareArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input photo (any format the decoder knows).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Built-in theme name.
    #[arg(long, default_value = "glow", conflicts_with = "theme_file")]
    theme: String,

    /// Custom theme JSON file, instead of a built-in.
    #[arg(long)]
    theme_file: Option<PathBuf>,

    /// Output directory; the filename is fixed by the theme.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Seed for the theme's procedural elements.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Also copy the result to the system clipboard.
    #[arg(long)]
    copy: bool,
}

#[derive(Parser, Debug)]
struct ShareArgs {
    /// Built-in theme name.
    #[arg(long, default_value = "glow")]
    theme: String,

    /// Previously rendered PNG to copy to the clipboard before sharing.
    #[arg(long)]
    image: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Themes => cmd_themes(),
        Command::Share(args) => cmd_share(args),
    }
}

fn resolve_theme(name: &str, file: Option<&Path>) -> anyhow::Result<haloframe::Theme> {
    if let Some(path) = file {
        return Ok(haloframe::Theme::from_path(path)?);
    }
    haloframe::Theme::builtin(name).with_context(|| {
        format!(
            "unknown theme '{name}' (built-ins: {})",
            haloframe::Theme::builtin_names().join(", ")
        )
    })
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let theme = resolve_theme(&args.theme, args.theme_file.as_deref())?;

    let mut session = haloframe::Session::new();
    session.load(&args.in_path)?;
    if session.source().is_none() {
        anyhow::bail!(
            "'{}' does not look like an image file",
            args.in_path.display()
        );
    }

    session.process(&theme, args.seed)?;
    let frame = session
        .output()
        .context("render finished without a frame (bug)")?;

    let out = haloframe::output_path(&args.out, &theme);
    haloframe::write_png(frame, &out)?;
    eprintln!("wrote {}", out.display());

    if args.copy {
        let ok = haloframe::copy_to_clipboard(frame);
        session.note_copy_result(ok);
        if ok {
            eprintln!("copied to clipboard");
        } else {
            eprintln!("clipboard unavailable; copy the file manually: {}", out.display());
        }
    }

    Ok(())
}

fn cmd_themes() -> anyhow::Result<()> {
    for name in haloframe::Theme::builtin_names() {
        println!("{name}");
    }
    Ok(())
}

fn cmd_share(args: ShareArgs) -> anyhow::Result<()> {
    let theme = resolve_theme(&args.theme, None)?;

    let frame = match &args.image {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("read image '{}'", path.display()))?;
            let source = haloframe::decode_image(&bytes)?;
            Some(haloframe::FrameRgba {
                width: source.width,
                height: source.height,
                data: source.rgba8_premul.as_ref().clone(),
                premultiplied: true,
            })
        }
        None => None,
    };

    let (url, copied) = haloframe::share(&theme, frame.as_ref());
    if args.image.is_some() && !copied {
        eprintln!("clipboard unavailable; attach the image manually");
    }
    println!("{url}");
    Ok(())
}
