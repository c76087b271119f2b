use std::io::{self, Write};

use crate::error::ReportError;
use crate::metrics::SampleEnvelope;
use crate::system_info::ProcessInfo;

use super::format::{human_bytes, Palette, Style};
use super::HealthSnapshot;

const LABEL_WIDTH: usize = 18;
const NAME_WIDTH: usize = 24;

fn heading<W: Write>(out: &mut W, palette: &Palette, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", palette.paint(Style::Heading, &format!("--- {} ---", title)))
}

fn field<W: Write>(out: &mut W, palette: &Palette, label: &str, value: &str) -> io::Result<()> {
    let padded = format!("{:<width$}", format!("{}:", label), width = LABEL_WIDTH);
    writeln!(out, "  {}{}", palette.paint(Style::Label, &padded), value)
}

fn truncate_name(name: &str) -> String {
    if name.chars().count() <= NAME_WIDTH {
        name.to_string()
    } else {
        let mut short: String = name.chars().take(NAME_WIDTH - 1).collect();
        short.push('~');
        short
    }
}

fn process_table<W: Write>(
    out: &mut W,
    palette: &Palette,
    table: &SampleEnvelope<Vec<ProcessInfo>>,
) -> io::Result<()> {
    let rows = match table.value.as_ref() {
        Some(rows) => rows,
        None => {
            return writeln!(out, "  {}", palette.paint(Style::Dim, table.placeholder_text()));
        }
    };

    let header = format!(
        "{:>8}  {:<name$}  {:>6}  {:>6}  {:>10}",
        "PID",
        "NAME",
        "CPU%",
        "MEM%",
        "RSS",
        name = NAME_WIDTH
    );
    writeln!(out, "  {}", palette.paint(Style::Dim, &header))?;

    if rows.is_empty() {
        return writeln!(out, "  {}", palette.paint(Style::Dim, "(no processes)"));
    }

    for process in rows {
        writeln!(
            out,
            "  {:>8}  {:<name$}  {:>6.1}  {:>6.1}  {:>10}",
            process.pid,
            truncate_name(&process.name),
            process.cpu_percent,
            process.memory_percent,
            human_bytes(process.memory_bytes),
            name = NAME_WIDTH
        )?;
    }
    Ok(())
}

pub fn render_text<W: Write>(
    snapshot: &HealthSnapshot,
    palette: &Palette,
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "{}", palette.paint(Style::Title, "=== Server Health Report ==="))?;
    field(
        out,
        palette,
        "Generated",
        &snapshot.generated_at.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
    )?;
    field(out, palette, "Host", &snapshot.host)?;

    heading(out, palette, "CPU")?;
    field(out, palette, "Usage", &palette.percent(snapshot.cpu.percent))?;

    let memory = &snapshot.memory;
    heading(out, palette, "Memory")?;
    field(
        out,
        palette,
        "Used",
        &format!(
            "{} / {} ({})",
            human_bytes(memory.used_bytes),
            human_bytes(memory.total_bytes),
            palette.percent(memory.used_percent)
        ),
    )?;
    field(out, palette, "Available", &human_bytes(memory.available_bytes))?;

    let disk = &snapshot.disk;
    heading(out, palette, "Disk")?;
    field(
        out,
        palette,
        "Used",
        &format!(
            "{} / {} ({})",
            human_bytes(disk.used_bytes),
            human_bytes(disk.total_bytes),
            palette.percent(disk.used_percent)
        ),
    )?;
    field(out, palette, "Filesystems", &disk.filesystems.len().to_string())?;

    heading(out, palette, &format!("Top {} processes by CPU", snapshot.top_n))?;
    process_table(out, palette, &snapshot.top_cpu)?;

    heading(out, palette, &format!("Top {} processes by memory", snapshot.top_n))?;
    process_table(out, palette, &snapshot.top_memory)?;

    if !snapshot.extras.is_empty() {
        heading(out, palette, "System")?;
        for extra in &snapshot.extras {
            match extra.value.value.as_deref() {
                Some(value) => field(out, palette, &extra.label, value)?,
                None => field(
                    out,
                    palette,
                    &extra.label,
                    &palette.paint(Style::Dim, extra.value.placeholder_text()),
                )?,
            }
        }
    }
    Ok(())
}

pub fn render_json<W: Write>(snapshot: &HealthSnapshot, out: &mut W) -> Result<(), ReportError> {
    serde_json::to_writer_pretty(&mut *out, snapshot)?;
    writeln!(out)?;
    Ok(())
}

pub fn render_error(palette: &Palette, err: &ReportError) -> String {
    format!("{}: {}", palette.paint(Style::Error, "Error generating report"), err)
}
