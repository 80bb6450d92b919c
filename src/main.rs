use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{self, Parser};
use log::{error, info, LevelFilter};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use mosaic_layout::mosaic::config::{DEFAULT_PENALTY, DEFAULT_TILE_SAMPLE_SIZE};
use mosaic_layout::mosaic::rendering::{
    apply_tint, export, render_layout, RenderConfig, DEFAULT_TINT_OPACITY,
};
use mosaic_layout::mosaic::{
    find_images, generate_with_colors, load_image, LayoutConfig, MosaicError,
};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Path to the main image
    #[clap(value_parser)]
    img: PathBuf,

    /// Path to directory containing tile images
    #[clap(value_parser)]
    tiles_dir: PathBuf,

    /// Number of cells along each side of the mosaic
    #[clap(default_value_t = 20_u32, short, long, value_parser = is_grid_size)]
    grid_size: u32,

    /// Score added per previous use of a tile when filling the remaining cells
    #[clap(default_value_t = DEFAULT_PENALTY, long, value_parser = is_non_negative)]
    penalty: f64,

    /// Tiles are downsampled to this size before averaging their color
    #[clap(default_value_t = DEFAULT_TILE_SAMPLE_SIZE, long, value_parser)]
    sample_size: u32,

    /// Minimum number of tiles required to build a mosaic
    #[clap(default_value_t = 2, long, value_parser)]
    min_tiles: usize,

    #[clap(long, default_values_t = [String::from("jpg"), String::from("jpeg"), String::from("png")])]
    /// Extensions of image files in the tiles dir
    extensions: Vec<String>,

    /// Where to write the layout
    #[clap(default_value = "./layout.bin", short, long, value_parser)]
    layout_out: PathBuf,

    /// Render the mosaic to this image path
    #[clap(short, long, value_parser)]
    output: Option<PathBuf>,

    /// The size of each tile in the rendered image
    #[clap(default_value_t = 32_u32, short = 's', long, value_parser)]
    tile_size: u32,

    /// Value between 0 and 1 indicating the opacity of the main image overlayed on the output image
    #[clap(default_value_t = DEFAULT_TINT_OPACITY, short, long, value_parser = is_between_zero_and_one)]
    tint_opacity: f64,

    /// Resize the rendered mosaic to this edge length (128 to 16000)
    #[clap(long, value_parser)]
    export_size: Option<u32>,

    /// Log debug output
    #[clap(short, long)]
    verbose: bool,
}

/// Parses str as u32 and returns the resulting value if between 10 and 100 (inclusive)
fn is_grid_size(s: &str) -> Result<u32, String> {
    let value: u32 = s.parse().map_err(|e| format!("{}", e))?;
    if (10..=100).contains(&value) {
        return Ok(value);
    }
    Err(String::from("Value must be between 10 and 100"))
}

fn is_non_negative(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if value.is_finite() && value >= 0.0 {
        return Ok(value);
    }
    Err(String::from("Value must be a finite number >= 0"))
}

/// Parses str as f64 and returns the resulting value if between 0 and 1 (inclusive)
fn is_between_zero_and_one(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if (0.0..=1.0).contains(&value) {
        return Ok(value);
    }
    Err(String::from("Value must be between 0 and 1"))
}

/// Validates that the input image path exists and is a file
fn validate_input_image(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Err(format!(
            "Input image does not exist: {}",
            path.display()
        ));
    }
    if !path.is_file() {
        return Err(format!("Input path is not a file: {}", path.display()));
    }
    Ok(())
}

/// Validates that the tiles directory exists
fn validate_tiles_directory(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Err(format!(
            "Tiles directory does not exist: {}",
            path.display()
        ));
    }
    if !path.is_dir() {
        return Err(format!(
            "Tiles path is not a directory: {}",
            path.display()
        ));
    }
    Ok(())
}

/// Validates that the output directory exists
fn validate_output_path(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(format!(
                "Output directory does not exist: {}",
                parent.display()
            ));
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let start_time = Instant::now();
    let result = run(cli);
    if let Err(e) = &result {
        error!("{}", e);
    }
    info!("Total execution time: {:.2}s", start_time.elapsed().as_secs_f64());
    result
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    validate_input_image(&cli.img)?;
    validate_tiles_directory(&cli.tiles_dir)?;
    validate_output_path(&cli.layout_out)?;
    if let Some(output) = &cli.output {
        validate_output_path(output)?;
    }

    let extensions: HashSet<String> = cli.extensions.iter().map(|x| x.to_lowercase()).collect();
    let tile_paths = find_images(&cli.tiles_dir, |ext| {
        extensions.contains(&ext.to_string_lossy().to_lowercase())
    })?;
    info!("Tile set with {} tiles", tile_paths.len());
    if tile_paths.is_empty() {
        return Err(MosaicError::NoTilesAvailable.into());
    }
    if tile_paths.len() < cli.min_tiles {
        return Err(format!(
            "Found {} tiles in {} but at least {} are required",
            tile_paths.len(),
            cli.tiles_dir.display(),
            cli.min_tiles
        )
        .into());
    }

    let config = LayoutConfig::default()
        .with_penalty(cli.penalty)
        .with_tile_sample_size(cli.sample_size)
        .with_progress(true);
    let generated = generate_with_colors(cli.img.as_path(), &tile_paths, cli.grid_size, &config)?;
    info!(
        "Generated a {}x{} layout",
        generated.layout.rows(),
        generated.layout.cols()
    );

    let stats = generated.stats();
    stats.summarise(|tile| tile_paths[tile].display().to_string());

    generated.layout.save(&cli.layout_out)?;
    info!("Layout written to {}", cli.layout_out.display());

    let output_path = match &cli.output {
        Some(output_path) => output_path,
        None => return Ok(()),
    };

    let render_config = RenderConfig {
        tile_size: cli.tile_size,
        tint_opacity: cli.tint_opacity,
        show_progress: true,
        ..RenderConfig::default()
    };
    let tiles = tile_paths
        .par_iter()
        .map(|path| load_image(path))
        .collect::<Result<Vec<_>, _>>()?;
    let mut mosaic = render_layout(&generated.layout, &tiles, &render_config)?;
    if render_config.tint_opacity > 0.0 {
        let main = load_image(&cli.img)?.to_rgb8();
        mosaic = apply_tint(&mosaic, &main, render_config.tint_opacity);
    }

    info!("Writing output file to {}", output_path.display());
    export(&mosaic, output_path, cli.export_size)?;

    let stats_path = output_path.with_extension("stats.png");
    info!(
        "Writing statistics visualization to {}",
        stats_path.display()
    );
    export(&stats.render(), &stats_path, None)?;

    info!("All done! Your mosaic is ready at {}", output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use mosaic_layout::MosaicLayout;

    fn args(paths: &[&PathBuf]) -> Vec<String> {
        paths.iter().map(|p| p.display().to_string()).collect()
    }

    #[test]
    fn test_is_grid_size() {
        assert_eq!(is_grid_size("10"), Ok(10));
        assert_eq!(is_grid_size("100"), Ok(100));
        assert!(is_grid_size("9").is_err());
        assert!(is_grid_size("101").is_err());
        assert!(is_grid_size("abc").is_err());
    }

    #[test]
    fn test_is_non_negative() {
        assert_eq!(is_non_negative("0"), Ok(0.0));
        assert_eq!(is_non_negative("50"), Ok(50.0));
        assert!(is_non_negative("-1").is_err());
        assert!(is_non_negative("inf").is_err());
    }

    #[test]
    fn test_is_between_zero_and_one() {
        assert_eq!(is_between_zero_and_one("0.5"), Ok(0.5));
        assert!(is_between_zero_and_one("1.5").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["mosaic-layout", "main.jpg", "tiles"]);
        assert_eq!(cli.grid_size, 20);
        assert_eq!(cli.penalty, 50.0);
        assert_eq!(cli.sample_size, 20);
        assert_eq!(cli.min_tiles, 2);
        assert_eq!(cli.layout_out, PathBuf::from("./layout.bin"));
        assert!(cli.output.is_none());
        assert_eq!(cli.tint_opacity, 0.65);
    }

    #[test]
    fn test_cli_rejects_out_of_range_grid() {
        assert!(Cli::try_parse_from(["mosaic-layout", "main.jpg", "tiles", "-g", "5"]).is_err());
    }

    #[test]
    fn test_validate_output_path_relative() {
        assert!(validate_output_path(Path::new("layout.bin")).is_ok());
        assert!(validate_output_path(Path::new("/definitely/not/here/layout.bin")).is_err());
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = std::env::temp_dir().join("mosaic_layout_cli_end_to_end");
        let _ = std::fs::remove_dir_all(&dir);
        let tiles_dir = dir.join("tiles");
        std::fs::create_dir_all(tiles_dir.join("nested")).unwrap();
        let colors = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [250, 250, 250]];
        for (i, color) in colors.iter().enumerate() {
            let path = if i == 3 {
                tiles_dir.join("nested").join("tile3.png")
            } else {
                tiles_dir.join(format!("tile{}.png", i))
            };
            RgbImage::from_pixel(12, 8, Rgb(*color)).save(path).unwrap();
        }
        std::fs::write(tiles_dir.join("notes.txt"), "not an image").unwrap();
        let main_path = dir.join("main.png");
        RgbImage::from_fn(40, 40, |x, y| Rgb([(x * 6) as u8, (y * 6) as u8, 128]))
            .save(&main_path)
            .unwrap();
        let layout_path = dir.join("layout.bin");
        let output_path = dir.join("mosaic.jpg");

        let mut argv = vec![String::from("mosaic-layout")];
        argv.extend(args(&[&main_path, &tiles_dir]));
        argv.extend(["-g", "10", "-s", "4", "--export-size", "200"].map(String::from));
        argv.push(String::from("-l"));
        argv.extend(args(&[&layout_path]));
        argv.push(String::from("-o"));
        argv.extend(args(&[&output_path]));
        let result = run(Cli::parse_from(argv));

        let layout = MosaicLayout::load(&layout_path);
        let output = image::open(&output_path);
        let stats_exists = dir.join("mosaic.stats.png").is_file();
        let _ = std::fs::remove_dir_all(&dir);

        assert!(result.is_ok(), "run failed: {:?}", result);
        let layout = layout.unwrap();
        assert_eq!((layout.rows(), layout.cols()), (10, 10));
        assert!(layout.validate(colors.len()).is_ok());
        assert!(layout.usage_counts(colors.len()).iter().all(|&uses| uses > 0));
        let output = output.unwrap();
        assert_eq!((output.width(), output.height()), (200, 200));
        assert!(stats_exists);
    }

    #[test]
    fn test_run_requires_min_tiles() {
        let dir = std::env::temp_dir().join("mosaic_layout_cli_min_tiles");
        let _ = std::fs::remove_dir_all(&dir);
        let tiles_dir = dir.join("tiles");
        std::fs::create_dir_all(&tiles_dir).unwrap();
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))
            .save(tiles_dir.join("only.png"))
            .unwrap();
        let main_path = dir.join("main.png");
        RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])).save(&main_path).unwrap();

        let mut argv = vec![String::from("mosaic-layout")];
        argv.extend(args(&[&main_path, &tiles_dir]));
        argv.push(String::from("-l"));
        argv.extend(args(&[&dir.join("layout.bin")]));
        let result = run(Cli::parse_from(argv));
        let _ = std::fs::remove_dir_all(&dir);

        assert!(result.is_err());
    }
}
