//! mra-decode: classify instruction words against the Arm encoding index

use std::env;
use std::path::{Path, PathBuf};

use mra_decode::cache;
use mra_decode::config::Config;
use mra_decode::index::{Decoded, DecodeTree};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut spec_dir: Option<String> = None;
    let mut cache_path: Option<String> = None;
    let mut words: Vec<u32> = Vec::new();

    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--spec" | "-s" => {
                spec_dir = iter.next().cloned();
            }
            "--cache" | "-c" => {
                cache_path = iter.next().cloned();
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            word => {
                let trimmed = word.trim_start_matches("0x").trim_start_matches("0X");
                let value = u32::from_str_radix(trimmed, 16)
                    .map_err(|_| anyhow::anyhow!("not a hex instruction word: {}", word))?;
                words.push(value);
            }
        }
    }

    if words.is_empty() {
        print_usage();
        return Ok(());
    }

    let config = Config::get();
    let spec_dir = spec_dir.unwrap_or_else(|| config.arm_spec_path());
    let cache_path = cache_path
        .or_else(|| config.cache_path().map(str::to_string))
        .map(PathBuf::from);

    let tree = load_tree(Path::new(&spec_dir), cache_path.as_deref())?;

    for word in words {
        match tree.decode(word) {
            Some(Decoded::Form(form)) => println!("{:#010x}  {}", word, form),
            Some(Decoded::Name(name)) => println!("{:#010x}  {} (no form page)", word, name),
            None => println!("{:#010x}  undecodable", word),
        }
    }

    Ok(())
}

/// Build the tree, going through the cache when one is configured.
fn load_tree(spec_dir: &Path, cache_path: Option<&Path>) -> anyhow::Result<DecodeTree> {
    if let Some(cache_path) = cache_path {
        match cache::load(cache_path) {
            Ok(tree) => return Ok(tree),
            Err(e) => log::info!("cache unusable ({}); rebuilding", e),
        }
        let tree = DecodeTree::load(spec_dir)?;
        if let Err(e) = cache::save(&tree, cache_path) {
            log::warn!("failed to write cache {}: {}", cache_path.display(), e);
        }
        return Ok(tree);
    }

    Ok(DecodeTree::load(spec_dir)?)
}

fn print_usage() {
    println!("Usage: mra-decode [--spec DIR] [--cache FILE] WORD...");
    println!();
    println!("Classify 32-bit instruction words (hex) against the Arm");
    println!("Machine Readable Architecture encoding index.");
    println!();
    println!("Options:");
    println!("  -s, --spec DIR    spec directory containing encodingindex.xml");
    println!("  -c, --cache FILE  load/store the built tree at FILE");
    println!();
    println!("The spec directory can also be set via ARM_SPEC_PATH or a");
    println!("mra-decode.toml config file:");
    println!();
    print!("{}", Config::sample_config());
}
