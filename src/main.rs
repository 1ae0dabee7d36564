// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

// Command line front-end for Konica Q-M and HP PhotoSmart cameras
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use qmlink::camera::{DateFormat, DateTime, ImageKind, Preference, TvOutputFormat};
use qmlink::config::{parse_data_bits, parse_parity, parse_stop_bits};
use qmlink::{localization, models, speed};
use qmlink::{BitRate, Camera, IdWidth, LineSettings, RealSerialPort, Speed, Timeouts};

#[derive(Parser)]
#[command(name = "qmlink")]
#[command(about = "Talk to Konica Q-M and HP PhotoSmart cameras over RS-232", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Serial port to use (e.g., /dev/ttyUSB0 or COM1)
    #[arg(short, long)]
    port: String,

    /// Baud rate the camera is listening at
    #[arg(short, long, default_value = "9600")]
    baud: u32,

    /// Data bits (5, 6, 7, or 8)
    #[arg(long, default_value = "8", value_name = "BITS")]
    data_bits: u8,

    /// Parity (none, odd, or even)
    #[arg(long, default_value = "none")]
    parity: String,

    /// Stop bits (1 or 2)
    #[arg(long, default_value = "1", value_name = "BITS")]
    stop_bits: u8,

    /// Camera model, selects how image ids are encoded
    #[arg(short, long)]
    model: Option<String>,

    /// Use 32-bit image ids regardless of model
    #[arg(long)]
    long_ids: bool,

    /// Search all bit rates for the camera instead of trusting --baud
    #[arg(long)]
    probe: bool,

    /// Switch to the fastest bit rate the camera supports
    #[arg(long, conflicts_with = "speed")]
    fastest: bool,

    /// Switch to this bit rate after connecting
    #[arg(long, value_name = "BAUD")]
    speed: Option<u32>,

    /// Seconds to wait for an image or preview download to start
    #[arg(long, default_value = "5", value_name = "SECS")]
    image_timeout: u64,

    /// Seconds to wait for the camera to answer after taking a picture
    #[arg(long, default_value = "60", value_name = "SECS")]
    capture_timeout: u64,

    /// Enable debug output
    #[arg(long)]
    debug: bool,

    /// Log every byte on the line
    #[arg(long)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the known camera models
    Models,
    /// Show model, serial number and firmware versions
    Info,
    /// Show power, card and counter status
    Status,
    /// Show supported bit rates and framing
    IoCapability,
    /// Show the camera clock
    Date,
    /// Set the camera clock (two-digit year)
    SetDate {
        year: u8,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    },
    /// Show the stored preferences
    Preferences,
    /// Change one preference
    SetPreference {
        #[arg(value_enum)]
        preference: PreferenceArg,
        value: u16,
    },
    /// Restore factory preferences
    ResetPreferences,
    /// List the images on the card
    List,
    /// Download an image
    Get {
        /// Image id, as shown by `list`
        id: u32,
        #[arg(short, long, value_enum, default_value = "jpeg")]
        kind: KindArg,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Grab a live preview
    Preview {
        #[arg(long)]
        thumbnail: bool,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Take a picture and store it on the card
    Capture,
    /// Erase one image
    Erase { id: u32 },
    /// Erase every unprotected image
    EraseAll,
    /// Format the card
    Format,
    /// Protect an image from erasing, or lift the protection
    Protect {
        id: u32,
        #[arg(long)]
        off: bool,
    },
    /// Choose the TV output format
    TvFormat {
        #[arg(value_enum)]
        format: TvFormatArg,
    },
    /// Choose how dates are shown
    DateFormat {
        #[arg(value_enum)]
        format: DateFormatArg,
    },
    /// Upload a localization file
    Localize { file: PathBuf },
    /// Abort the operation the camera is busy with
    Cancel,
}

#[derive(Copy, Clone, ValueEnum)]
enum KindArg {
    Thumbnail,
    Jpeg,
    Exif,
}

#[derive(Copy, Clone, ValueEnum)]
enum PreferenceArg {
    Resolution,
    Exposure,
    SelfTimerTime,
    SlideShowInterval,
    Flash,
    FocusSelfTimer,
    AutoOffTime,
    Beep,
}

#[derive(Copy, Clone, ValueEnum)]
enum TvFormatArg {
    Ntsc,
    Pal,
    Hide,
}

#[derive(Copy, Clone, ValueEnum)]
enum DateFormatArg {
    Mdy,
    Dmy,
    Ymd,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn init_logging(debug: bool, trace: bool) {
    let level = if trace {
        "trace"
    } else if debug {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug, cli.trace);

    if let Commands::Models = cli.command {
        for model in models::MODELS.iter() {
            let ids = match model.ids {
                IdWidth::Short => "16-bit ids",
                IdWidth::Long => "32-bit ids",
            };
            println!("{:<20} {}", model.name, ids);
        }
        return;
    }

    let settings = match line_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let ids = match id_width(&cli) {
        Ok(ids) => ids,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let serial_port = match RealSerialPort::open(&cli.port, &settings) {
        Ok(port) => port,
        Err(e) => {
            eprintln!("Failed to open serial port: {}", e);
            std::process::exit(1);
        }
    };

    let mut camera = Camera::new(Box::new(serial_port), ids).with_timeouts(timeouts(&cli));
    if let Err(e) = connect(&mut camera, &cli) {
        eprintln!("Could not connect to camera: {}", e);
        std::process::exit(1);
    }

    let result = run(&mut camera, cli.command);
    if let Err(e) = camera.exit() {
        eprintln!("Closing session failed: {}", e);
    }
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn line_settings(cli: &Cli) -> Result<LineSettings, String> {
    Ok(LineSettings {
        baud_rate: cli.baud,
        data_bits: parse_data_bits(cli.data_bits)?,
        parity: parse_parity(&cli.parity)?,
        stop_bits: parse_stop_bits(cli.stop_bits)?,
    })
}

fn timeouts(cli: &Cli) -> Timeouts {
    Timeouts {
        image: Duration::from_secs(cli.image_timeout),
        preview: Duration::from_secs(cli.image_timeout),
        capture: Duration::from_secs(cli.capture_timeout),
        ..Timeouts::default()
    }
}

fn id_width(cli: &Cli) -> Result<IdWidth, String> {
    if cli.long_ids {
        return Ok(IdWidth::Long);
    }
    match &cli.model {
        None => Ok(IdWidth::default()),
        Some(name) => models::find(name)
            .map(|model| model.ids)
            .ok_or_else(|| format!("Unknown model: {}. Run `qmlink models` for the list", name)),
    }
}

fn connect(camera: &mut Camera, cli: &Cli) -> CliResult<()> {
    if cli.probe {
        let rate = speed::probe(camera.link_mut())?;
        eprintln!("Camera found at {} baud", rate);
    } else {
        camera.init()?;
    }

    let target = match cli.speed {
        Some(baud) => Some(Speed::Exact(
            BitRate::from_baud(baud).ok_or_else(|| format!("Unsupported bit rate: {}", baud))?,
        )),
        None if cli.fastest => Some(Speed::Highest),
        None => None,
    };
    if let Some(target) = target {
        let rate = camera.set_speed(target)?;
        eprintln!("Talking at {} baud", rate);
    }
    Ok(())
}

fn run(camera: &mut Camera, command: Commands) -> CliResult<()> {
    match command {
        Commands::Models => {}
        Commands::Info => {
            let info = camera.get_information()?;
            println!("Model:         {}", info.model);
            println!("Serial number: {}", info.serial_number);
            println!("Hardware:      {}", info.hardware);
            println!("Software:      {}", info.software);
            println!("Testing:       {}", info.testing);
            println!("Name:          {}", info.name);
            println!("Manufacturer:  {}", info.manufacturer);
        }
        Commands::Status => {
            let status = camera.get_status()?;
            println!("Self test:      {:#06x}", status.self_test_result);
            println!("Power:          {:?} ({:?})", status.power_level, status.power_source);
            println!("Card:           {:?}, {} KB", status.card_status, status.card_size);
            println!("Display:        {:?}", status.display);
            println!("Pictures:       {} ({} left)", status.pictures, status.pictures_left);
            println!("Date:           {}", status.date);
            println!("Flash:          {}", status.flash);
            println!("Resolution:     {}", status.resolution);
            println!("Focus:          {}", status.focus);
            println!("Exposure:       {}", status.exposure);
            println!("Total pictures: {}", status.total_pictures);
            println!("Total strobes:  {}", status.total_strobes);
        }
        Commands::IoCapability => {
            let io = camera.get_io_capability()?;
            println!("Bit rates: {}", io.bit_rates);
            println!("Flags:     {}", io.bit_flags);
        }
        Commands::Date => println!("{}", camera.get_date_time()?),
        Commands::SetDate { year, month, day, hour, minute, second } => {
            camera.set_date_time(DateTime { year, month, day, hour, minute, second })?;
        }
        Commands::Preferences => {
            let prefs = camera.get_preferences()?;
            println!("Shutoff time:        {}", prefs.shutoff_time);
            println!("Self timer time:     {}", prefs.self_timer_time);
            println!("Beep:                {}", prefs.beep);
            println!("Slide show interval: {}", prefs.slide_show_interval);
        }
        Commands::SetPreference { preference, value } => {
            camera.set_preference(preference.into(), value)?;
        }
        Commands::ResetPreferences => camera.reset_preferences()?,
        Commands::List => {
            let pictures = camera.get_status()?.pictures;
            for number in 1..=pictures as u32 {
                let image = camera.get_image_info(number)?;
                let mark = if image.protected { " (protected)" } else { "" };
                println!("{:4}  id {:<10} exif {:>6} bytes{}", number, image.id, image.exif_size, mark);
            }
        }
        Commands::Get { id, kind, output } => {
            let data = camera.get_image(id, kind.into())?;
            std::fs::write(&output, &data)?;
            println!("Wrote {} bytes to {}", data.len(), output.display());
        }
        Commands::Preview { thumbnail, output } => {
            let data = camera.get_preview(thumbnail)?;
            std::fs::write(&output, &data)?;
            println!("Wrote {} bytes to {}", data.len(), output.display());
        }
        Commands::Capture => {
            let image = camera.take_picture()?;
            println!("Stored as image {}", image.id);
        }
        Commands::Erase { id } => camera.erase_image(id)?,
        Commands::EraseAll => {
            let left = camera.erase_all()?;
            if left > 0 {
                println!("{} protected images were kept", left);
            }
        }
        Commands::Format => camera.format_card()?,
        Commands::Protect { id, off } => camera.set_protect(id, !off)?,
        Commands::TvFormat { format } => camera.set_tv_output_format(format.into())?,
        Commands::DateFormat { format } => camera.set_date_format(format.into())?,
        Commands::Localize { file } => {
            let text = std::fs::read_to_string(&file)?;
            let data = localization::parse(&text)?;
            camera.put_localization_data(&data)?;
            println!("Uploaded {} bytes of localization data", data.len());
        }
        Commands::Cancel => {
            let cancelled = camera.cancel()?;
            println!("Cancelled command {:#06x}", cancelled);
        }
    }
    Ok(())
}

impl From<KindArg> for ImageKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Thumbnail => ImageKind::Thumbnail,
            KindArg::Jpeg => ImageKind::Jpeg,
            KindArg::Exif => ImageKind::Exif,
        }
    }
}

impl From<PreferenceArg> for Preference {
    fn from(preference: PreferenceArg) -> Self {
        match preference {
            PreferenceArg::Resolution => Preference::Resolution,
            PreferenceArg::Exposure => Preference::Exposure,
            PreferenceArg::SelfTimerTime => Preference::SelfTimerTime,
            PreferenceArg::SlideShowInterval => Preference::SlideShowInterval,
            PreferenceArg::Flash => Preference::Flash,
            PreferenceArg::FocusSelfTimer => Preference::FocusSelfTimer,
            PreferenceArg::AutoOffTime => Preference::AutoOffTime,
            PreferenceArg::Beep => Preference::Beep,
        }
    }
}

impl From<TvFormatArg> for TvOutputFormat {
    fn from(format: TvFormatArg) -> Self {
        match format {
            TvFormatArg::Ntsc => TvOutputFormat::Ntsc,
            TvFormatArg::Pal => TvOutputFormat::Pal,
            TvFormatArg::Hide => TvOutputFormat::Hide,
        }
    }
}

impl From<DateFormatArg> for DateFormat {
    fn from(format: DateFormatArg) -> Self {
        match format {
            DateFormatArg::Mdy => DateFormat::MonthDayYear,
            DateFormatArg::Dmy => DateFormat::DayMonthYear,
            DateFormatArg::Ymd => DateFormat::YearMonthDay,
        }
    }
}
