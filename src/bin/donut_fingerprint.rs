use clap::{Arg, ArgAction, ArgMatches, Command};
use donut_fingerprint::options::{
  SUPPORTED_BROWSERS, SUPPORTED_DEVICES, SUPPORTED_OPERATING_SYSTEMS,
};
use donut_fingerprint::{
  FingerprintGenerator, GenerationOptions, HeaderMap, HttpVersion, NetworkDefinitions,
};
use std::error::Error;
use std::path::Path;
use std::process;

fn build_cli() -> Command {
  Command::new("donut-fingerprint")
    .about("Generate browser fingerprints with matching HTTP headers")
    .arg(
      Arg::new("browser")
        .long("browser")
        .action(ArgAction::Append)
        .value_parser(clap::builder::PossibleValuesParser::new(
          SUPPORTED_BROWSERS.iter().copied(),
        ))
        .help("Browser to generate for (repeatable)"),
    )
    .arg(
      Arg::new("os")
        .long("os")
        .action(ArgAction::Append)
        .value_parser(clap::builder::PossibleValuesParser::new(
          SUPPORTED_OPERATING_SYSTEMS.iter().copied(),
        ))
        .help("Operating system to generate for (repeatable)"),
    )
    .arg(
      Arg::new("device")
        .long("device")
        .action(ArgAction::Append)
        .value_parser(clap::builder::PossibleValuesParser::new(
          SUPPORTED_DEVICES.iter().copied(),
        ))
        .help("Device type to generate for (repeatable)"),
    )
    .arg(
      Arg::new("locale")
        .long("locale")
        .action(ArgAction::Append)
        .help("Locale in preference order (repeatable)"),
    )
    .arg(
      Arg::new("http-version")
        .long("http-version")
        .value_parser(["1", "2"])
        .help("HTTP version of the generated headers"),
    )
    .arg(
      Arg::new("options")
        .long("options")
        .help("JSON or YAML file with generation options"),
    )
    .arg(
      Arg::new("header")
        .long("header")
        .action(ArgAction::Append)
        .help("Request header as NAME:VALUE (repeatable)"),
    )
    .arg(
      Arg::new("count")
        .short('n')
        .long("count")
        .value_parser(clap::value_parser!(u32).range(1..))
        .default_value("1")
        .help("Number of fingerprints to generate"),
    )
    .arg(
      Arg::new("data-dir")
        .long("data-dir")
        .help("Directory with network definitions (defaults to the bundled set)"),
    )
    .arg(
      Arg::new("pretty")
        .long("pretty")
        .action(ArgAction::SetTrue)
        .help("Pretty-print the JSON output"),
    )
}

fn strings(matches: &ArgMatches, id: &str) -> Option<Vec<String>> {
  matches
    .get_many::<String>(id)
    .map(|values| values.cloned().collect())
}

fn read_options_file(path: &Path) -> Result<GenerationOptions, Box<dyn Error>> {
  let contents = std::fs::read_to_string(path)
    .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
  let is_yaml = path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

  let options = if is_yaml {
    GenerationOptions::from_yaml_str(&contents)?
  } else {
    GenerationOptions::from_json_str(&contents)?
  };
  Ok(options)
}

fn options_from_flags(matches: &ArgMatches) -> Result<GenerationOptions, Box<dyn Error>> {
  let mut options = GenerationOptions::new();
  if let Some(browsers) = strings(matches, "browser") {
    options = options.with_browsers(browsers);
  }
  if let Some(operating_systems) = strings(matches, "os") {
    options = options.with_operating_systems(operating_systems);
  }
  if let Some(devices) = strings(matches, "device") {
    options = options.with_devices(devices);
  }
  if let Some(locales) = strings(matches, "locale") {
    options = options.with_locales(locales);
  }
  if let Some(version) = matches.get_one::<String>("http-version") {
    options = options.with_http_version(version.parse::<HttpVersion>()?);
  }
  Ok(options)
}

fn request_headers(matches: &ArgMatches) -> Result<HeaderMap, Box<dyn Error>> {
  let mut headers = HeaderMap::new();
  for header in matches.get_many::<String>("header").into_iter().flatten() {
    let (name, value) = header
      .split_once(':')
      .ok_or_else(|| format!("Header must be NAME:VALUE, got {header:?}"))?;
    headers.insert(name.trim().to_string(), value.trim().to_string());
  }
  Ok(headers)
}

fn run(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
  let file_options = match matches.get_one::<String>("options") {
    Some(path) => read_options_file(Path::new(path))?,
    None => GenerationOptions::default(),
  };
  let default_options = file_options.merged_with(&options_from_flags(matches)?);
  let headers = request_headers(matches)?;

  let definitions = match matches.get_one::<String>("data-dir") {
    Some(dir) => NetworkDefinitions::from_dir(dir)?,
    None => NetworkDefinitions::bundled()?,
  };
  let generator = FingerprintGenerator::from_definitions(default_options, &definitions)?;

  let count = matches.get_one::<u32>("count").copied().unwrap_or(1);
  let pretty = matches.get_flag("pretty");
  log::info!("Generating {count} fingerprint(s)");

  for _ in 0..count {
    let result = generator.get_fingerprint(&GenerationOptions::default(), &headers)?;
    let output = if pretty {
      serde_json::to_string_pretty(&result)?
    } else {
      serde_json::to_string(&result)?
    };
    println!("{output}");
  }

  Ok(())
}

fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
    .format_timestamp_millis()
    .target(env_logger::Target::Stderr)
    .init();

  let matches = build_cli().get_matches();

  if let Err(e) = run(&matches) {
    eprintln!("Error: {e}");
    process::exit(1);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(args: &[&str]) -> ArgMatches {
    build_cli()
      .try_get_matches_from(std::iter::once("donut-fingerprint").chain(args.iter().copied()))
      .unwrap()
  }

  #[test]
  fn test_flags_become_options() {
    let matches = parse(&[
      "--browser",
      "chrome",
      "--browser",
      "firefox",
      "--os",
      "linux",
      "--locale",
      "de-DE",
      "--http-version",
      "1",
    ]);
    let options = options_from_flags(&matches).unwrap();

    let names: Vec<&str> = options
      .browsers
      .as_ref()
      .unwrap()
      .iter()
      .map(|entry| entry.name())
      .collect();
    assert_eq!(names, vec!["chrome", "firefox"]);
    assert_eq!(options.locales, Some(vec!["de-DE".to_string()]));
    assert_eq!(options.http_version, Some(HttpVersion::Http1));
    assert!(options.devices.is_none());
  }

  #[test]
  fn test_unsupported_browser_is_rejected() {
    let result = build_cli().try_get_matches_from(["donut-fingerprint", "--browser", "opera"]);
    assert!(result.is_err());
  }

  #[test]
  fn test_request_headers_parse() {
    let matches = parse(&["--header", "Cookie: a=1", "--header", "X-Trace:abc"]);
    let headers = request_headers(&matches).unwrap();
    assert_eq!(headers.get("Cookie").map(String::as_str), Some("a=1"));
    assert_eq!(headers.get("X-Trace").map(String::as_str), Some("abc"));

    let matches = parse(&["--header", "no-separator"]);
    assert!(request_headers(&matches).is_err());
  }

  #[test]
  fn test_options_file_formats() {
    let dir = tempfile::tempdir().unwrap();
    let yaml_path = dir.path().join("options.yaml");
    std::fs::write(&yaml_path, "browsers:\n  - safari\nlocales: [fr-FR]\n").unwrap();
    let options = read_options_file(&yaml_path).unwrap();
    assert_eq!(options.locales, Some(vec!["fr-FR".to_string()]));

    let json_path = dir.path().join("options.json");
    std::fs::write(&json_path, r#"{"colour": "blue"}"#).unwrap();
    assert!(read_options_file(&json_path).is_err());
  }
}
