use regex::Regex;

use crate::config::Settings;
use crate::error::FileError;

/// The compiled slicer-comment filter lists. Built once per parser from
/// [`Settings`], applied to every comment line during header/footer scans.
#[derive(Debug)]
pub(crate) struct FileFilters {
    layer_height: Vec<Regex>,
    filament: Vec<Regex>,
    generated_by: Vec<Regex>,
    print_time: Vec<Regex>,
    simulated_time: Vec<Regex>,
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>, FileError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| FileError::InvalidFilter {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

impl FileFilters {
    pub(crate) fn compile(settings: &Settings) -> Result<FileFilters, FileError> {
        Ok(FileFilters {
            layer_height: compile(&settings.layer_height_filters)?,
            filament: compile(&settings.filament_filters)?,
            generated_by: compile(&settings.generated_by_filters)?,
            print_time: compile(&settings.print_time_filters)?,
            simulated_time: compile(&settings.simulated_time_filters)?,
        })
    }

    /// The layer height in millimetres, from the first matching filter.
    pub(crate) fn layer_height(&self, comment: &str) -> Option<f64> {
        for filter in &self.layer_height {
            if let Some(captures) = filter.captures(comment)
                && let Some(mm) = captures.name("mm")
                && let Ok(value) = mm.as_str().parse()
            {
                return Some(value);
            }
        }
        None
    }

    /// Filament usage in millimetres. The first filter with at least one
    /// match wins; every match on the line contributes one value, so
    /// multi-extruder usage lines yield one entry per extruder. A `m` group
    /// is scaled from metres.
    pub(crate) fn filament_usage(&self, comment: &str) -> Vec<f64> {
        for filter in &self.filament {
            let mut values = Vec::new();
            for captures in filter.captures_iter(comment) {
                if let Some(mm) = captures.name("mm")
                    && let Ok(value) = mm.as_str().parse::<f64>()
                {
                    values.push(value);
                } else if let Some(m) = captures.name("m")
                    && let Ok(value) = m.as_str().parse::<f64>()
                {
                    values.push(value * 1000.0);
                }
            }
            if !values.is_empty() {
                return values;
            }
        }
        Vec::new()
    }

    /// The slicer name from capture group 1 of the first matching filter.
    pub(crate) fn generated_by(&self, comment: &str) -> Option<String> {
        for filter in &self.generated_by {
            if let Some(captures) = filter.captures(comment)
                && let Some(name) = captures.get(1)
            {
                let name = name.as_str().trim();
                if !name.is_empty() {
                    return Some(name.to_string());
                }
            }
        }
        None
    }

    /// The estimated print time in seconds.
    pub(crate) fn print_time(&self, comment: &str) -> Option<u64> {
        extract_time(&self.print_time, comment)
    }

    /// The simulated print time in seconds.
    pub(crate) fn simulated_time(&self, comment: &str) -> Option<u64> {
        extract_time(&self.simulated_time, comment)
    }
}

/// Sum the `h`/`m`/`s` groups of the first filter that captures at least one
/// of them.
fn extract_time(filters: &[Regex], comment: &str) -> Option<u64> {
    for filter in filters {
        let Some(captures) = filter.captures(comment) else {
            continue;
        };
        let mut seconds = 0.0;
        let mut matched = false;
        for (name, scale) in [("h", 3600.0), ("m", 60.0), ("s", 1.0)] {
            if let Some(group) = captures.name(name)
                && let Ok(value) = group.as_str().parse::<f64>()
            {
                seconds += value * scale;
                matched = true;
            }
        }
        if matched {
            return Some(seconds.round() as u64);
        }
    }
    None
}
