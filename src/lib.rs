mod docx;
mod error;
mod fonts;
mod layout;
mod markup;
mod model;
mod pdf;
mod sanitize;
mod story;

pub use docx::{parse as parse_docx, parse_reader as parse_docx_reader};
pub use error::{Error, ErrorKind};
pub use layout::PageLayout;
pub use model::{Document, Paragraph, Table};
pub use sanitize::{clean, sanitize};
pub use story::{BLANK_SPACE, Block, INCH, PARAGRAPH_GAP, StyleClass, build_story};

use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default)]
pub struct ConvertOptions {
    pub layout: PageLayout,
}

/// Where the PDF for `input` goes: same directory, `.pdf` extension.
pub fn output_path(input: &Path) -> PathBuf {
    input.with_extension("pdf")
}

/// Lay out and serialize a story into PDF bytes.
pub fn render_story(story: &[Block], options: &ConvertOptions, title: Option<&str>) -> Result<Vec<u8>, Error> {
    let pages = layout::compose(story, &options.layout)?;
    Ok(pdf::render(&pages, &options.layout, title))
}

/// Convert `input` to a PDF next to it and return the path written.
pub fn convert(input: &Path) -> Result<PathBuf, Error> {
    let output = output_path(input);
    convert_docx_to_pdf(input, &output)?;
    Ok(output)
}

pub fn convert_docx_to_pdf(input: &Path, output: &Path) -> Result<(), Error> {
    convert_with_options(input, output, &ConvertOptions::default())
}

pub fn convert_with_options(input: &Path, output: &Path, options: &ConvertOptions) -> Result<(), Error> {
    if !input.is_file() {
        return Err(Error::FileNotFound(input.to_path_buf()));
    }
    log::info!("Converting {} -> {}", input.display(), output.display());

    let doc = docx::parse(input)?;
    let story = build_story(&doc);
    log::debug!("Story has {} blocks", story.len());

    let title = input.file_stem().and_then(|s| s.to_str());
    let bytes = render_story(&story, options, title)?;
    write_output(output, &bytes)?;

    log::info!("Wrote {} bytes to {}", bytes.len(), output.display());
    Ok(())
}

/// Write the finished PDF. A file this call created or truncated is removed
/// again if writing fails; a file it could not open is left untouched.
fn write_output(output: &Path, bytes: &[u8]) -> Result<(), Error> {
    let mut file = std::fs::File::create(output)?;
    if let Err(e) = file.write_all(bytes).and_then(|()| file.sync_all()) {
        drop(file);
        if std::fs::remove_file(output).is_err() {
            log::warn!("Could not remove partial output {}", output.display());
        }
        return Err(Error::Io(e));
    }
    Ok(())
}
