use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fieldstamp_core::{
    apply_event, load_document, write_document, EditorEvent, EditorState, Extent, FieldKind,
    ScreenPoint,
};
use fieldstamp_engine::{default_backend, DocumentMutator, OpenSource, PageRenderer};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "fieldstamp")]
#[command(about = "Fieldstamp CLI")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Stamp fields into a PDF and write the modified document.
    Stamp {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Field to stamp, as kind:page:x,y[:WxH][:text]. Repeatable.
        #[arg(long = "field", value_name = "SPEC", value_parser = parse_field_spec)]
        fields: Vec<FieldSpec>,
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Render a page preview PNG.
    Preview {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

/// One `--field` argument: which kind of field to place, where, and with
/// what label. Position is in screen space (top-left origin, pixels), at
/// one pixel per point.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub page: u32,
    pub position: ScreenPoint,
    pub extent: Option<Extent>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    pages: Vec<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    page: u32,
    width_pt: f32,
    height_pt: f32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Stamp { file, fields, output } => run_stamp(&file, &fields, output.as_deref()),
        Commands::Preview { file, page, output } => run_preview(&file, page, output.as_deref()),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut backend = default_backend();
    let handle = backend.load(OpenSource::from(file)).context("failed to open PDF")?;

    let page_count = backend.page_count(handle)?;
    let mut pages = Vec::with_capacity(page_count as usize);
    for page in 1..=page_count {
        let metrics = backend.page_metrics(handle, page)?;
        pages.push(PageSizeOutput {
            page,
            width_pt: metrics.width_pt,
            height_pt: metrics.height_pt,
        });
    }

    let payload = InfoOutput { path: file.display().to_string(), page_count, pages };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    backend.close(handle)?;

    Ok(())
}

fn run_stamp(file: &Path, specs: &[FieldSpec], output: Option<&Path>) -> Result<()> {
    ensure_pdf_exists(file)?;

    if specs.is_empty() {
        anyhow::bail!("at least one --field is required");
    }

    let mut backend = default_backend();
    let mut state = EditorState::new();
    load_document(&mut state, &mut backend, OpenSource::from(file))
        .context("failed to open PDF")?;
    let handle = state.document.context("no document loaded")?;

    let page_count = state.session.page_count();
    for spec in specs {
        if spec.page == 0 || spec.page > page_count {
            anyhow::bail!(
                "field page {} is out of range (document has {page_count} pages)",
                spec.page
            );
        }
    }

    for spec in specs {
        let rendered = backend.render_page(handle, spec.page).context("failed to render page")?;
        apply_event(
            &mut state,
            EditorEvent::PageRendered {
                page: spec.page,
                pixel_width: rendered.layout.pixel_width,
                pixel_height: rendered.layout.pixel_height,
                page_count: rendered.layout.total_page_count,
            },
        );
        apply_event(&mut state, EditorEvent::GoToPage { page: spec.page });

        apply_event(&mut state, EditorEvent::StartPending { kind: spec.kind });
        if let Some(text) = &spec.text {
            apply_event(&mut state, EditorEvent::SetPendingText { text: text.clone() });
        }
        apply_event(&mut state, EditorEvent::PointerDownBackground);
        apply_event(&mut state, EditorEvent::PointerMoved { position: spec.position });
        apply_event(&mut state, EditorEvent::PointerReleased);

        let placed_before = state.fields.len();
        apply_event(&mut state, EditorEvent::Place);
        if state.fields.len() == placed_before {
            anyhow::bail!("field on page {} was not placed (text must not be blank)", spec.page);
        }

        if let Some(extent) = spec.extent {
            let index = state.fields.len() - 1;
            apply_event(
                &mut state,
                EditorEvent::Resize { index, width: extent.width, height: extent.height },
            );
        }
    }

    let bytes = write_document(&mut state, &mut backend)
        .context("failed to write document")?
        .context("no document loaded")?;

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_stamp_output(file));
    fs::write(&output, &bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("{}", output.display());

    if let Some(handle) = state.document.take() {
        backend.close(handle)?;
    }

    Ok(())
}

fn run_preview(file: &Path, page: u32, output: Option<&Path>) -> Result<()> {
    ensure_pdf_exists(file)?;

    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    let mut backend = default_backend();
    let handle = backend.load(OpenSource::from(file)).context("failed to open PDF")?;

    let rendered = backend.render_page(handle, page).context("failed to render page")?;

    let output =
        output.map(ToOwned::to_owned).unwrap_or_else(|| default_preview_output(file, page));

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    rendered
        .image
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    backend.close(handle)?;

    Ok(())
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_stamp_output(file: &Path) -> PathBuf {
    file.with_file_name("modified.pdf")
}

fn default_preview_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("preview");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}

fn parse_field_spec(spec: &str) -> Result<FieldSpec, String> {
    let mut parts = spec.splitn(5, ':');

    let kind = match parts.next().unwrap_or_default() {
        "text" => FieldKind::Text,
        "signature" => FieldKind::Signature,
        "email" => FieldKind::Email,
        other => {
            return Err(format!("unknown field kind {other:?} (expected text, signature, or email)"))
        }
    };

    let page_raw = parts.next().ok_or_else(|| "missing page number".to_owned())?;
    let page: u32 =
        page_raw.parse().map_err(|_| format!("invalid page number {page_raw:?}"))?;
    if page == 0 {
        return Err("page numbers are 1-based".to_owned());
    }

    let position_raw = parts.next().ok_or_else(|| "missing x,y position".to_owned())?;
    let position = parse_point(position_raw)?;

    let extent = match parts.next() {
        Some(raw) if !raw.is_empty() => Some(parse_extent(raw)?),
        _ => None,
    };
    let text = parts.next().map(ToOwned::to_owned);

    Ok(FieldSpec { kind, page, position, extent, text })
}

fn parse_point(raw: &str) -> Result<ScreenPoint, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("invalid position {raw:?} (expected x,y)"))?;

    Ok(ScreenPoint::new(parse_coord(x)?, parse_coord(y)?))
}

fn parse_extent(raw: &str) -> Result<Extent, String> {
    let (width, height) =
        raw.split_once('x').ok_or_else(|| format!("invalid size {raw:?} (expected WxH)"))?;

    Ok(Extent::new(parse_coord(width)?, parse_coord(height)?))
}

fn parse_coord(raw: &str) -> Result<f32, String> {
    raw.trim().parse().map_err(|_| format!("invalid number {raw:?}"))
}
