use std::io::{self, Write};

use serde::Serialize;

use crate::descriptor::ProductDescriptor;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub trait ProductSink {
    fn emit(&self, descriptor: &ProductDescriptor) -> io::Result<()>;
}

pub struct TextOutput;

impl ProductSink for TextOutput {
    fn emit(&self, descriptor: &ProductDescriptor) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{descriptor}")
    }
}

pub struct JsonOutput;

impl JsonOutput {
    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProductSink for JsonOutput {
    fn emit(&self, descriptor: &ProductDescriptor) -> io::Result<()> {
        Self::print_json(descriptor)
    }
}

pub fn sink_for(mode: OutputMode) -> Box<dyn ProductSink> {
    match mode {
        OutputMode::Text => Box::new(TextOutput),
        OutputMode::Json => Box::new(JsonOutput),
    }
}
