use clap::{ Arg, App };
use tracing::error;
use tracing_subscriber::EnvFilter;

use std::error::Error;

use anpr::LprConfig;


fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = App::new("anpr")
                    .version(env!("CARGO_PKG_VERSION"))
                    .author("kingrong")
                    .about("Automatic Number Plate Recognition")
                    .arg(Arg::with_name("image")
                        .long("image")
                        .value_name("PATH")
                        .help("Path to the input image.")
                        .takes_value(true)
                        .required(true))
                    .arg(Arg::with_name("show")
                        .long("show")
                        .help("Display the annotated result"))
                    .get_matches();
    let image = matches.value_of("image").ok_or("image is required")?;

    let config = LprConfig::from_env();
    match anpr::recognize_plate(&config, image, matches.is_present("show")) {
        Ok(recognition) => println!("{}", recognition.text),
        Err(e) => {
            error!("{}", e);
            if let Some(path) = e.model_path() {
                error!("make sure {} exists", path.display());
            }
        }
    }

    Ok(())
}
