mod act;
pub mod fields;
mod native;

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use chrono::{DateTime, Utc};

pub use act::ActLogNormalizer;
pub use fields::FieldError;

use crate::operation::Operation;
use crate::settings::{LogFormat, ReplaySettings};

pub const FIELD_DELIMITER: char = '|';
pub const COMMENT_MARKER: char = '#';
const MIN_FIELD_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineOutcome {
    Emitted,
    Filtered,
    UnknownTag,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub total_lines: u64,
    pub rejected_lines: u64,
    pub malformed_lines: u64,
    pub unknown_tag_lines: u64,
    pub filtered_lines: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    pub operations: Vec<Operation>,
    pub stats: ParseStats,
}

pub fn split_log_line(line: &str) -> Option<Vec<&str>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || line.starts_with(COMMENT_MARKER) {
        return None;
    }

    let fields = line.split(FIELD_DELIMITER).collect::<Vec<&str>>();
    if fields.len() < MIN_FIELD_COUNT {
        return None;
    }
    Some(fields)
}

pub fn detect_line_format(line: &str) -> Option<LogFormat> {
    let fields = split_log_line(line)?;
    if fields[0].trim().parse::<u32>().is_ok() {
        return Some(LogFormat::Act);
    }
    if fields[1].len() == 4 && native::native_decoder(fields[1]).is_some() {
        return Some(LogFormat::Native);
    }
    None
}

pub fn detect_log_format(log_path: &Path) -> Option<LogFormat> {
    let file = match File::open(log_path) {
        Ok(file) => file,
        Err(error) => {
            tracing::warn!(
                log_path = %log_path.display(),
                "Failed to open log for format detection: {error}"
            );
            return None;
        }
    };

    LossyLines::new(file)
        .map_while(Result::ok)
        .find_map(|line| split_log_line(&line).and_then(|_| detect_line_format(&line)))
}

// Invalid UTF-8 is replaced rather than ending the read.
struct LossyLines<R> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
}

impl<R: Read> LossyLines<R> {
    fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buffer: Vec::new(),
        }
    }
}

impl<R: Read> Iterator for LossyLines<R> {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => None,
            Ok(_) => Some(Ok(String::from_utf8_lossy(&self.buffer).into_owned())),
            Err(error) => Some(Err(error)),
        }
    }
}

pub(crate) trait LineConsumer {
    fn format(&self) -> LogFormat;
    fn consume_fields(&mut self, fields: &[&str]) -> Result<LineOutcome, FieldError>;
    fn into_operations(self) -> Vec<Operation>;
}

/// Format-A consumer. Every decoded line maps to at most one operation; the
/// only cross-line state is the last emitted timestamp.
#[derive(Debug, Default)]
pub struct NativeLogParser {
    operations: Vec<Operation>,
}

impl NativeLogParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    fn clamp_timestamp(&self, line_timestamp: DateTime<Utc>) -> DateTime<Utc> {
        match self.operations.last() {
            Some(last) if last.timestamp > line_timestamp => last.timestamp,
            _ => line_timestamp,
        }
    }
}

impl LineConsumer for NativeLogParser {
    fn format(&self) -> LogFormat {
        LogFormat::Native
    }

    fn consume_fields(&mut self, fields: &[&str]) -> Result<LineOutcome, FieldError> {
        let Some(decoder) = native::native_decoder(fields::field(fields, 1)?) else {
            return Ok(LineOutcome::UnknownTag);
        };
        let line_timestamp = self.clamp_timestamp(fields::timestamp(fields, 0)?);

        Ok(match decoder(fields)? {
            Some(kind) => {
                self.operations.push(Operation::new(line_timestamp, kind));
                LineOutcome::Emitted
            }
            None => LineOutcome::Filtered,
        })
    }

    fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}

impl LineConsumer for ActLogNormalizer {
    fn format(&self) -> LogFormat {
        LogFormat::Act
    }

    fn consume_fields(&mut self, fields: &[&str]) -> Result<LineOutcome, FieldError> {
        ActLogNormalizer::consume_fields(self, fields)
    }

    fn into_operations(self) -> Vec<Operation> {
        ActLogNormalizer::into_operations(self)
    }
}

fn tag_of<'a>(format: LogFormat, fields: &[&'a str]) -> &'a str {
    let index = match format {
        LogFormat::Native => 1,
        LogFormat::Act => 0,
    };
    fields.get(index).copied().unwrap_or_default()
}

fn consume_line<C: LineConsumer>(
    consumer: &mut C,
    stats: &mut ParseStats,
    line_number: u64,
    line: &str,
) {
    stats.total_lines += 1;
    let Some(fields) = split_log_line(line) else {
        stats.rejected_lines += 1;
        return;
    };

    match consumer.consume_fields(&fields) {
        Ok(LineOutcome::Emitted) => {}
        Ok(LineOutcome::Filtered) => stats.filtered_lines += 1,
        Ok(LineOutcome::UnknownTag) => {
            stats.unknown_tag_lines += 1;
            tracing::trace!(
                line_number,
                tag = tag_of(consumer.format(), &fields),
                "Skipping line with unknown tag"
            );
        }
        Err(error) => {
            stats.malformed_lines += 1;
            tracing::debug!(
                line_number,
                tag = tag_of(consumer.format(), &fields),
                %error,
                "Skipping malformed log line"
            );
        }
    }
}

pub(crate) fn parse_lines<'a, C: LineConsumer>(
    mut consumer: C,
    lines: impl IntoIterator<Item = &'a str>,
) -> ParsedLog {
    let mut stats = ParseStats::default();
    for (index, line) in lines.into_iter().enumerate() {
        consume_line(&mut consumer, &mut stats, index as u64 + 1, line);
    }

    ParsedLog {
        operations: consumer.into_operations(),
        stats,
    }
}

fn parse_file<C: LineConsumer>(mut consumer: C, log_path: &Path) -> ParsedLog {
    let format = consumer.format();
    let mut stats = ParseStats::default();

    match File::open(log_path) {
        Ok(file) => {
            for line_result in LossyLines::new(file) {
                let line = match line_result {
                    Ok(line) => line,
                    Err(error) => {
                        tracing::warn!(
                            log_path = %log_path.display(),
                            line_number = stats.total_lines + 1,
                            "Stopped reading log after read failure: {error}"
                        );
                        break;
                    }
                };
                let line_number = stats.total_lines + 1;
                consume_line(&mut consumer, &mut stats, line_number, &line);
            }
        }
        Err(error) => {
            tracing::warn!(
                log_path = %log_path.display(),
                "Failed to open log file: {error}"
            );
        }
    }

    let operations = consumer.into_operations();
    tracing::info!(
        log_path = %log_path.display(),
        format = ?format,
        operations = operations.len(),
        total_lines = stats.total_lines,
        malformed_lines = stats.malformed_lines,
        unknown_tag_lines = stats.unknown_tag_lines,
        "Parsed log"
    );

    ParsedLog { operations, stats }
}

pub fn parse_native_log(log_path: &Path) -> ParsedLog {
    parse_file(NativeLogParser::new(), log_path)
}

pub fn parse_act_log(log_path: &Path, network_delta: i32) -> ParsedLog {
    parse_file(ActLogNormalizer::new(network_delta), log_path)
}

pub fn parse_log(log_path: &Path, settings: &ReplaySettings) -> ParsedLog {
    let format = settings.format.or_else(|| detect_log_format(log_path));
    match format {
        Some(LogFormat::Native) => parse_native_log(log_path),
        Some(LogFormat::Act) => parse_act_log(log_path, settings.network_delta),
        None => {
            tracing::warn!(
                log_path = %log_path.display(),
                "Unable to determine log format"
            );
            ParsedLog::default()
        }
    }
}
