use clap::Parser;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::time::Duration;
use xword_csp::backtracking_search::{find_fill, FillFailure, FillOptions};
use xword_csp::grid_config::{generate_grid_config_from_template_string, render_grid};
use xword_csp::word_list::{WordList, WordListSourceConfig};

/// xword-csp: Fill a crossword structure with words from a vocabulary file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the structure file, with _ (or .) representing open cells and anything else
    /// representing blocks
    structure_path: String,

    /// Path to the vocabulary file, one word per line
    words_path: String,

    /// Path to write the filled grid to, in addition to printing it
    output_path: Option<String>,

    /// Give up after this many seconds [default: none]
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Give up after visiting this many search states [default: none]
    #[arg(long)]
    max_states: Option<usize>,

    /// Shuffle candidate order with this seed before searching
    #[arg(long)]
    seed: Option<u64>,
}

struct Error(String);

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0) // Print error unquoted
    }
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let args = Args::parse();

    let template = fs::read_to_string(&args.structure_path)
        .map_err(|_| Error(format!("Couldn't read file '{}'", args.structure_path)))?;

    let word_list = WordList::new(
        vec![WordListSourceConfig::File {
            id: "0".into(),
            path: args.words_path.clone().into(),
        }],
        None,
    );

    #[allow(clippy::comparison_chain)]
    if let Some(errors) = word_list.get_source_errors().get("0") {
        if errors.len() == 1 {
            return Err(Error(format!("{}", errors[0])));
        } else if errors.len() > 1 {
            let mut full_error: String = "".into();
            for error in errors {
                full_error.push_str(&format!("\n- {error}"));
            }
            return Err(Error(full_error));
        }
    }

    let grid_config = generate_grid_config_from_template_string(word_list, &template)
        .map_err(|error| Error(format!("Invalid structure: {error}")))?;
    let config = grid_config.to_config_ref();

    let options = FillOptions {
        timeout: args.timeout_secs.map(Duration::from_secs),
        max_states: args.max_states,
        rng_seed: args.seed,
    };

    let result = match find_fill(&config, &options) {
        Ok(result) => result,
        Err(FillFailure::NoSolution) => {
            println!("{}", FillFailure::NoSolution);
            return Ok(());
        }
        Err(failure) => return Err(Error(failure.to_string())),
    };

    log::info!("{:?}", result.statistics);

    let rendered = render_grid(&config, &result.assignment);
    println!("{rendered}");

    if let Some(output_path) = &args.output_path {
        fs::write(output_path, format!("{rendered}\n"))
            .map_err(|_| Error(format!("Couldn't write file '{output_path}'")))?;
    }

    Ok(())
}
