// main.rs      gifkit command
//
// Copyright (c) 2019-2026  Douglas Lau
//
#![forbid(unsafe_code)]

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use gifkit::block::DisposalMethod;
use gifkit::{Decoder, Encoder, Frame, Gif};
use pix::rgb::SRgba8;
use pix::Raster;
use std::error::Error;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Crate version
const VERSION: &str = std::env!("CARGO_PKG_VERSION");

/// Demo animation size
const DEMO_SZ: u32 = 300;

/// Main entry point
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder().format_timestamp(None).init();
    let mut out = StandardStream::stdout(ColorChoice::Always);
    match create_app().get_matches().subcommand() {
        ("show", Some(matches)) => show(&mut out, matches)?,
        ("demo", Some(matches)) => demo(&mut out, matches)?,
        _ => unreachable!(),
    }
    out.reset()?;
    Ok(())
}

/// Create clap App
fn create_app() -> App<'static, 'static> {
    App::new("gifkit")
        .version(VERSION)
        .setting(AppSettings::GlobalVersion)
        .about("GIF file utility")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("show")
                .about("Show GIF frame table")
                .arg(
                    Arg::with_name("files")
                        .required(true)
                        .min_values(1)
                        .help("input file(s)"),
                ),
        )
        .subcommand(
            SubCommand::with_name("demo")
                .about("Write a demo animation")
                .arg(
                    Arg::with_name("output")
                        .required(true)
                        .help("output file"),
                ),
        )
}

/// Handle show subcommand
fn show(
    out: &mut StandardStream,
    matches: &ArgMatches,
) -> Result<(), Box<dyn Error>> {
    if let Some(values) = matches.values_of_os("files") {
        for path in values {
            show_file(out, path)?;
        }
    }
    Ok(())
}

/// Show one GIF file
fn show_file(
    out: &mut StandardStream,
    path: &OsStr,
) -> Result<(), Box<dyn Error>> {
    let mut magenta = ColorSpec::new();
    magenta.set_fg(Some(Color::Magenta));
    let mut red = ColorSpec::new();
    red.set_fg(Some(Color::Red)).set_intense(true);
    let mut yellow = ColorSpec::new();
    yellow.set_fg(Some(Color::Yellow)).set_intense(true);
    let mut cyan = ColorSpec::new();
    cyan.set_fg(Some(Color::Cyan)).set_intense(true);
    let mut bold = ColorSpec::new();
    bold.set_fg(Some(Color::White))
        .set_intense(true)
        .set_bold(true);
    out.set_color(&magenta)?;
    writeln!(out, "{:?}", path)?;
    let f = BufReader::new(File::open(path)?);
    let gif = match Decoder::new(f).skip_unknown_extensions(true).decode() {
        Ok(gif) => gif,
        Err(e) => {
            out.set_color(&red)?;
            writeln!(out, "{}", e)?;
            return Ok(());
        }
    };
    let screen = gif.screen_desc();
    let frame_digits = digits(gif.frames().len()).max(3);
    let width = screen.width();
    let height = screen.height();
    let size_digits = 4.max(1 + digits(width) + digits(height));
    let version = String::from_utf8_lossy(&gif.header().version()).to_string();
    let mut comments = vec![];
    for cmt in gif.comments() {
        for l in cmt.split('\n') {
            let l = l.trim();
            if !l.is_empty() {
                comments.push(l.to_string());
            }
        }
    }
    out.set_color(&bold)?;
    write!(out, "GIF{}, frames: {}", version, gif.frames().len())?;
    if let Some(c) = gif.loop_count() {
        write!(out, ", repeat: ")?;
        if c == 0 {
            write!(out, "∞")?;
        } else {
            write!(out, "{}", c)?;
        }
    }
    writeln!(out)?;
    if !comments.is_empty() {
        out.set_color(&cyan)?;
        for c in comments {
            writeln!(out, "  # {}", c)?;
        }
    }
    out.set_color(&yellow)?;
    write!(out, " {:>w$}", "Fr#", w = frame_digits)?;
    write!(out, "  Delay Disp")?;
    write!(out, " {:>w$}", "Size", w = size_digits)?;
    write!(out, " {:>w$}", "X,Y", w = size_digits)?;
    writeln!(out, " Clrs Trn")?;
    let global_clr = gif
        .global_palette()
        .map(|p| p.color_table().len())
        .unwrap_or_default();
    let table = Table {
        width,
        height,
        global_clr,
        frame_digits,
        size_digits,
    };
    for (n, frame) in gif.frames().iter().enumerate() {
        table.show_frame(out, frame, n)?;
    }
    Ok(())
}

/// Frame table layout
struct Table {
    width: u16,
    height: u16,
    global_clr: usize,
    frame_digits: usize,
    size_digits: usize,
}

impl Table {
    /// Show one frame of a GIF file
    fn show_frame(
        &self,
        out: &mut StandardStream,
        frame: &Frame,
        number: usize,
    ) -> Result<(), Box<dyn Error>> {
        let mut dflt = ColorSpec::new();
        dflt.set_fg(Some(Color::White));
        let mut bold = ColorSpec::new();
        bold.set_fg(Some(Color::White))
            .set_intense(true)
            .set_bold(true);
        let desc = frame.image_desc();
        out.set_color(&dflt)?;
        let interlaced = if desc.interlaced() { 'i' } else { ' ' };
        write!(out, "{}", interlaced)?;
        out.set_color(&bold)?;
        write!(out, "{:>w$}", number, w = self.frame_digits)?;
        let d = frame.delay_time_cs();
        if d == 0 {
            out.set_color(&dflt)?;
        }
        write!(out, " {:6.2}", f32::from(d) / 100.0)?;
        let disp = match frame.graphic_control().map(|c| c.disposal_method())
        {
            Some(DisposalMethod::Undefined) => "none",
            Some(DisposalMethod::Keep) => "keep",
            Some(DisposalMethod::Clear) => "bg",
            Some(DisposalMethod::Restore) => "prev",
            None => "-",
        };
        out.set_color(match disp {
            "none" | "-" => &dflt,
            _ => &bold,
        })?;
        write!(out, " {:>4}", disp)?;
        if self.width == desc.width() && self.height == desc.height() {
            out.set_color(&dflt)?;
        } else {
            out.set_color(&bold)?;
        }
        write!(
            out,
            " {:>w$}",
            &format!("{}x{}", desc.width(), desc.height()),
            w = self.size_digits
        )?;
        if desc.left() == 0 && desc.top() == 0 {
            out.set_color(&dflt)?;
        } else {
            out.set_color(&bold)?;
        }
        write!(
            out,
            " {:>w$}",
            &format!("{},{}", desc.left(), desc.top()),
            w = self.size_digits
        )?;
        match frame.local_palette() {
            Some(palette) => {
                out.set_color(&bold)?;
                write!(out, "  {:3}", palette.color_table().len())?;
            }
            None => {
                out.set_color(&dflt)?;
                write!(out, " {:3}g", self.global_clr)?;
            }
        }
        match frame.transparent_color() {
            Some(tc) => {
                out.set_color(&bold)?;
                writeln!(out, " {:>3}", tc)?;
            }
            None => {
                out.set_color(&dflt)?;
                writeln!(out, " {:>3}", "-")?;
            }
        }
        Ok(())
    }
}

/// Handle demo subcommand
fn demo(
    out: &mut StandardStream,
    matches: &ArgMatches,
) -> Result<(), Box<dyn Error>> {
    let path = matches.value_of_os("output").ok_or("missing output")?;
    let mut gif = Gif::new(DEMO_SZ as u16, DEMO_SZ as u16);
    let blue = SRgba8::new(0, 0, 0xFF, 0xFF);
    for i in 0..5 {
        let mut raster = Raster::with_clear(DEMO_SZ, DEMO_SZ);
        for y in 0..10 {
            for x in 0..10 {
                *raster.pixel_mut(i * 20 + x, i * 20 + y) = blue;
            }
        }
        gif.push_frame(Frame::new(raster)?.with_delay_time_cs(100));
    }
    let f = BufWriter::new(File::create(path)?);
    Encoder::new(f).encode(&gif)?;
    let mut bold = ColorSpec::new();
    bold.set_fg(Some(Color::White))
        .set_intense(true)
        .set_bold(true);
    out.set_color(&bold)?;
    writeln!(out, "wrote {:?}", path)?;
    Ok(())
}

/// Calculate digits in a number
fn digits<T: Into<usize>>(v: T) -> usize {
    let v = v.into();
    match v {
        0..=9 => 1,
        10..=99 => 2,
        100..=999 => 3,
        1000..=9999 => 4,
        _ => 5,
    }
}
