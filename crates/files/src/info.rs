use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::time::SystemTime;

use log::{debug, trace};
use printhost_commands::{Code, CodeKind, Tokenizer};
use printhost_machine::{DirectoryCategory, ModelProvider};
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::error::FileError;
use crate::filters::FileFilters;
use crate::paths::PathResolver;
use crate::reverse::ReverseLineReader;

/// Slicer metadata mined from a print file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedFileInfo {
    /// The virtual path the file was requested as.
    pub file_name: String,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time, when the filesystem reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<SystemTime>,
    /// Z height of the initial printing layer (mm).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_layer_height: Option<f64>,
    /// Z advance per layer (mm).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_height: Option<f64>,
    /// Total object height (mm).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Number of layers, derived from the three heights above.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_layers: Option<u32>,
    /// Filament usage per extruder (mm).
    pub filament: Vec<f64>,
    /// The slicer that produced the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,
    /// Estimated print time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_time: Option<u64>,
    /// Simulated print time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulated_time: Option<u64>,
}

impl ParsedFileInfo {
    /// Whether every field the scans look for has been found, so scanning
    /// can stop early.
    pub fn is_complete(&self) -> bool {
        self.height.is_some()
            && self.first_layer_height.is_some()
            && self.layer_height.is_some()
            && !self.filament.is_empty()
            && self.generated_by.is_some()
    }
}

/// Which way a scan walks the file. Height capture differs: the header scan
/// looks for the first layer's Z, the footer scan for the object height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanDirection {
    Forward,
    Backward,
}

/// Extracts [`ParsedFileInfo`] from a print file by scanning a bounded
/// number of bytes from its start and end.
///
/// Construction compiles the configured filter regexes once; [`parse`] can
/// then be called for any number of files. The resolver consults the machine
/// model under a read scope, which is released before the file is opened.
///
/// [`parse`]: FileInfoParser::parse
#[derive(Debug)]
pub struct FileInfoParser {
    resolver: PathResolver,
    filters: FileFilters,
    buffer_size: usize,
    header_limit: u64,
    footer_limit: u64,
    max_layer_height: f64,
}

impl FileInfoParser {
    /// Create a parser from settings, compiling the filter lists.
    pub fn new(
        settings: &Settings,
        provider: Arc<ModelProvider>,
    ) -> Result<FileInfoParser, FileError> {
        Ok(FileInfoParser {
            resolver: PathResolver::new(settings, provider),
            filters: FileFilters::compile(settings)?,
            buffer_size: settings.file_info_read_buffer_size.max(64),
            header_limit: settings.file_info_read_limit_header,
            footer_limit: settings.file_info_read_limit_footer,
            max_layer_height: settings.max_layer_height,
        })
    }

    /// The resolver this parser uses for virtual paths.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Scan the file behind `virtual_path` and collect whatever metadata the
    /// header and footer yield. Lines that fail to tokenize are skipped as
    /// noise; only I/O errors and cancellation abort the scan.
    pub fn parse(
        &self,
        virtual_path: &str,
        token: &CancellationToken,
    ) -> Result<ParsedFileInfo, FileError> {
        let physical = self
            .resolver
            .to_physical(virtual_path, DirectoryCategory::GCodes)?;
        debug!("parsing file info of {}", physical.display());

        let file = File::open(&physical).map_err(FileError::io(&physical))?;
        let metadata = file.metadata().map_err(FileError::io(&physical))?;
        let mut info = ParsedFileInfo {
            file_name: virtual_path.to_string(),
            size: metadata.len(),
            last_modified: metadata.modified().ok(),
            ..ParsedFileInfo::default()
        };

        let mut reader = BufReader::with_capacity(self.buffer_size, file);
        self.scan_header(&mut reader, &mut info, token)
            .map_err(map_scan_err(&physical))?;
        self.scan_footer(reader.into_inner(), &mut info, token)
            .map_err(map_scan_err(&physical))?;

        if let (Some(height), Some(first), Some(layer)) =
            (info.height, info.first_layer_height, info.layer_height)
            && height > 0.0
            && first > 0.0
            && layer > 0.0
        {
            info.num_layers = Some(((height - first) / layer).round() as u32 + 1);
        }
        debug!("file info of {virtual_path}: complete={}", info.is_complete());
        Ok(info)
    }

    /// Walk lines from the start of the file until the byte budget runs out
    /// or two consecutive lines add nothing while the info is complete.
    fn scan_header(
        &self,
        reader: &mut BufReader<File>,
        info: &mut ParsedFileInfo,
        token: &CancellationToken,
    ) -> Result<(), ScanError> {
        let budget = self.header_limit + self.buffer_size as u64;
        let mut bytes_read = 0u64;
        let mut in_relative_mode = false;
        let mut last_line_had_info = false;
        let mut line = String::new();
        loop {
            if token.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            line.clear();
            let n = reader.read_line(&mut line)?;
            if n == 0 {
                break;
            }
            bytes_read += n as u64;

            let line_had_info =
                self.scan_line(&line, info, &mut in_relative_mode, ScanDirection::Forward);
            if !line_had_info && !last_line_had_info && info.is_complete() {
                break;
            }
            last_line_had_info = line_had_info;
            if bytes_read > budget {
                break;
            }
        }
        Ok(())
    }

    /// Walk lines from the end of the file toward its start, mirroring the
    /// header scan's stop conditions.
    fn scan_footer(
        &self,
        file: File,
        info: &mut ParsedFileInfo,
        token: &CancellationToken,
    ) -> Result<(), ScanError> {
        let budget = self.footer_limit + self.buffer_size as u64;
        let mut reader = ReverseLineReader::new(file, self.buffer_size)?;
        let mut bytes_read = 0u64;
        // Mode commands are encountered after the moves they governed, so a
        // G90 seen here marks the moves still to come (earlier in the file)
        // as absolute.
        let mut in_relative_mode = false;
        let mut last_line_had_info = false;
        while let Some(line) = reader.read_line()? {
            if token.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            bytes_read += line.len() as u64 + 1;

            let line_had_info =
                self.scan_line(&line, info, &mut in_relative_mode, ScanDirection::Backward);
            if !line_had_info && !last_line_had_info && info.is_complete() {
                break;
            }
            last_line_had_info = line_had_info;
            if bytes_read > budget {
                break;
            }
        }
        Ok(())
    }

    /// Tokenize one line and collect whatever it contributes. Returns
    /// whether anything new was learned.
    fn scan_line(
        &self,
        line: &str,
        info: &mut ParsedFileInfo,
        in_relative_mode: &mut bool,
        direction: ScanDirection,
    ) -> bool {
        let mut had_info = false;
        let mut tokenizer = Tokenizer::new(line);
        let mut code = Code::new();
        // Each line is tokenized on its own, so the G53 carry never crosses
        // lines no matter which way the file is walked.
        let mut enforcing_abs = false;
        loop {
            match tokenizer.next_code(&mut code, &mut enforcing_abs) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    // Print files may contain non-code noise; skip the line.
                    trace!("skipping unparsable line: {e}");
                    break;
                }
            }

            if code.kind == CodeKind::GCode {
                match code.major_number {
                    Some(0) | Some(1) => {
                        if let Some(z) = code.parameter('Z').and_then(|p| p.as_float().ok()) {
                            had_info |= self.capture_z_move(&code, z, *in_relative_mode, info, direction);
                        }
                    }
                    Some(90) => *in_relative_mode = false,
                    Some(91) => *in_relative_mode = true,
                    _ => {}
                }
            }
            if let Some(comment) = &code.comment {
                had_info |= self.scan_comment(comment, info);
            }
        }
        had_info
    }

    /// Record a `G0`/`G1` Z move: the first plausible absolute Z as the
    /// first layer height (forward), the last absolute Z as the object
    /// height (backward) unless its comment marks an extrusion value.
    fn capture_z_move(
        &self,
        code: &Code,
        z: f64,
        in_relative_mode: bool,
        info: &mut ParsedFileInfo,
        direction: ScanDirection,
    ) -> bool {
        if in_relative_mode {
            return false;
        }
        match direction {
            ScanDirection::Forward => {
                if info.first_layer_height.is_none() && z > 0.0 && z <= self.max_layer_height {
                    info.first_layer_height = Some(z);
                    return true;
                }
            }
            ScanDirection::Backward => {
                let extrusion_comment = code
                    .comment
                    .as_deref()
                    .is_some_and(|c| c.trim_start().starts_with('E'));
                if info.height.is_none() && z > 0.0 && !extrusion_comment {
                    info.height = Some(z);
                    return true;
                }
            }
        }
        false
    }

    /// Try each extractor, in order, for every field still unset.
    fn scan_comment(&self, comment: &str, info: &mut ParsedFileInfo) -> bool {
        let mut had_info = false;
        if info.layer_height.is_none()
            && let Some(value) = self.filters.layer_height(comment)
        {
            info.layer_height = Some(value);
            had_info = true;
        }
        if info.filament.is_empty() {
            let usage = self.filters.filament_usage(comment);
            if !usage.is_empty() {
                info.filament = usage;
                had_info = true;
            }
        }
        if info.generated_by.is_none()
            && let Some(name) = self.filters.generated_by(comment)
        {
            info.generated_by = Some(name);
            had_info = true;
        }
        if info.print_time.is_none()
            && let Some(seconds) = self.filters.print_time(comment)
        {
            info.print_time = Some(seconds);
            had_info = true;
        }
        if info.simulated_time.is_none()
            && let Some(seconds) = self.filters.simulated_time(comment)
        {
            info.simulated_time = Some(seconds);
            had_info = true;
        }
        had_info
    }
}

/// Internal scan failure; converted to [`FileError`] with the file path
/// attached at the `parse` boundary.
#[derive(Debug)]
enum ScanError {
    Io(std::io::Error),
    Cancelled,
}

impl From<std::io::Error> for ScanError {
    fn from(source: std::io::Error) -> ScanError {
        ScanError::Io(source)
    }
}

fn map_scan_err(path: &std::path::Path) -> impl FnOnce(ScanError) -> FileError {
    let path = path.to_path_buf();
    move |e| match e {
        ScanError::Io(source) => FileError::Io { path, source },
        ScanError::Cancelled => FileError::Cancelled,
    }
}
