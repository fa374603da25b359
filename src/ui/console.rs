use anyhow::{anyhow, Context, Result};
use stationfinder::controller::{ControllerHandle, DiscoveryState, Status, UiCommand};
use stationfinder::models::{FacetKind, SortKey, Station, WILDCARD};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands:
  country <name|all>     language <name|all>     tag <name|all>
  search <text>          sort name|votes|clicks
  next | prev            pick <n>
  facets country|language|tag
  help | quit";

const MAX_FACETS_SHOWN: usize = 60;
const MAX_SUBTITLE_TAGS: usize = 3;

#[derive(Debug, PartialEq)]
enum Input {
    Command(UiCommand),
    Facets(FacetKind),
    Help,
    Quit,
}

/// Reads commands from stdin and prints a page for every new snapshot.
pub async fn run(handle: ControllerHandle) -> Result<()> {
    let mut state_rx = handle.state_rx.clone();
    let printer = tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let snapshot = state_rx.borrow_and_update().clone();
            println!("{}", render(&snapshot));
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("stdin read error")? {
        match parse_input(&line) {
            Ok(None) => {}
            Ok(Some(Input::Quit)) => break,
            Ok(Some(Input::Help)) => println!("{HELP}"),
            Ok(Some(Input::Facets(kind))) => {
                let listing = facet_listing(&handle.state_rx.borrow(), kind);
                println!("{listing}");
            }
            Ok(Some(Input::Command(cmd))) => handle.send(cmd)?,
            Err(e) => println!("{e}"),
        }
    }

    printer.abort();
    handle.shutdown().await;
    Ok(())
}

/// Selection sink: shows the chosen station and where it streams from.
pub fn print_choice(station: Station) {
    println!("▶ {}", station.name.trim());
    println!("  {}", station.stream_address().trim());
    if let Some(icon) = station.favicon.as_deref().map(str::trim).filter(|i| !i.is_empty()) {
        println!("  icon: {icon}");
    }
}

fn parse_input(line: &str) -> Result<Option<Input>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, arg) = match line.split_once(char::is_whitespace) {
        Some((v, a)) => (v, a.trim()),
        None => (line, ""),
    };
    let input = match verb.to_ascii_lowercase().as_str() {
        "country" => Input::Command(UiCommand::SetCountry(facet_arg(arg))),
        "language" | "lang" => Input::Command(UiCommand::SetLanguage(facet_arg(arg))),
        "tag" | "genre" => Input::Command(UiCommand::SetTag(facet_arg(arg))),
        "search" | "find" => Input::Command(UiCommand::SetTerm(arg.to_string())),
        "sort" => Input::Command(UiCommand::SetSort(arg.parse::<SortKey>()?)),
        "next" | "n" => Input::Command(UiCommand::NextPage),
        "prev" | "p" => Input::Command(UiCommand::PrevPage),
        "pick" => {
            let n: usize = arg
                .parse()
                .map_err(|_| anyhow!("pick expects a number from the current page"))?;
            if n == 0 {
                return Err(anyhow!("pick expects a number from the current page"));
            }
            Input::Command(UiCommand::Choose(n - 1))
        }
        "facets" => Input::Facets(arg.parse::<FacetKind>()?),
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        other => return Err(anyhow!("unknown command: {other} (try `help`)")),
    };
    Ok(Some(input))
}

fn facet_arg(arg: &str) -> String {
    if arg.is_empty() {
        WILDCARD.to_string()
    } else {
        arg.to_string()
    }
}

fn render(state: &DiscoveryState) -> String {
    let sel = &state.selection;
    let mut out = String::new();
    out.push_str(&format!(
        "country: {} · language: {} · tag: {} · sort: {}",
        sel.country.as_deref().unwrap_or(WILDCARD),
        sel.language.as_deref().unwrap_or(WILDCARD),
        sel.tag.as_deref().unwrap_or(WILDCARD),
        sel.sort.as_param(),
    ));
    if !sel.term.is_empty() {
        out.push_str(&format!(" · name contains \"{}\"", sel.term));
    }
    out.push('\n');
    if state.loading_metadata {
        out.push_str("Loading filter options…\n");
    }
    if let Some(e) = &state.metadata_error {
        out.push_str(&format!("{e}\n"));
    }

    match state.status() {
        Status::Failed(e) => out.push_str(&format!("{e}\n")),
        Status::Searching => out.push_str("Loading…\n"),
        Status::NoResults => out.push_str("No results.\n"),
        Status::Results => {}
    }

    for (i, s) in state.page.entries.iter().enumerate() {
        out.push_str(&format!("{:>3}. {}", i + 1, ellipsize_chars(s.name.trim(), 48)));
        let subtitle = station_subtitle(s);
        if !subtitle.is_empty() {
            out.push_str(&format!("  ({subtitle})"));
        }
        out.push('\n');
    }
    if !state.displayed.is_empty() {
        out.push_str(&format!(
            "page {}/{} · {} stations{}{}",
            state.page.page,
            state.page.total_pages,
            state.displayed.len(),
            if state.page.has_prev() { " · prev" } else { "" },
            if state.page.has_next() { " · next" } else { "" },
        ));
    }
    out
}

fn facet_listing(state: &DiscoveryState, kind: FacetKind) -> String {
    let vocab = state.facets.get(kind);
    let shown: Vec<&str> = vocab
        .entries()
        .iter()
        .take(MAX_FACETS_SHOWN)
        .map(String::as_str)
        .collect();
    let mut out = format!("{kind}: {}", shown.join(", "));
    let hidden = vocab.entries().len().saturating_sub(MAX_FACETS_SHOWN);
    if hidden > 0 {
        out.push_str(&format!(" … ({hidden} more)"));
    }
    out
}

fn ellipsize_chars(s: &str, max_chars: usize) -> String {
    let mut it = s.chars();
    let taken: String = it.by_ref().take(max_chars).collect();
    if it.next().is_some() {
        format!("{taken}…")
    } else {
        taken
    }
}

fn station_subtitle(s: &Station) -> String {
    let mut parts: Vec<String> = Vec::new();
    for field in [&s.country, &s.codec] {
        let field = field.trim();
        if !field.is_empty() {
            parts.push(field.to_string());
        }
    }
    if s.bitrate > 0 {
        parts.push(format!("{} kbps", s.bitrate));
    }
    let tags: Vec<&str> = s.tag_list().take(MAX_SUBTITLE_TAGS).collect();
    if !tags.is_empty() {
        parts.push(tags.join(", "));
    }
    parts.join(" · ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use stationfinder::error::DiscoveryError;
    use stationfinder::pagination::page_view;

    fn station(name: &str) -> Station {
        serde_json::from_value(serde_json::json!({
            "stationuuid": format!("u-{name}"),
            "name": name,
            "url_resolved": "http://example.com/s",
            "country": "France",
            "codec": "MP3",
            "bitrate": 128,
        }))
        .unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_input("country France").unwrap(),
            Some(Input::Command(UiCommand::SetCountry("France".into())))
        );
        assert_eq!(
            parse_input("tag").unwrap(),
            Some(Input::Command(UiCommand::SetTag("all".into())))
        );
        assert_eq!(
            parse_input("search  Jazz FM ").unwrap(),
            Some(Input::Command(UiCommand::SetTerm("Jazz FM".into())))
        );
        assert_eq!(
            parse_input("sort clicks").unwrap(),
            Some(Input::Command(UiCommand::SetSort(SortKey::ClickCount)))
        );
        assert_eq!(
            parse_input("pick 3").unwrap(),
            Some(Input::Command(UiCommand::Choose(2)))
        );
        assert_eq!(parse_input("facets tags").unwrap(), Some(Input::Facets(FacetKind::Tag)));
        assert_eq!(parse_input("  ").unwrap(), None);
        assert_eq!(parse_input("QUIT").unwrap(), Some(Input::Quit));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_input("pick 0").is_err());
        assert!(parse_input("pick x").is_err());
        assert!(parse_input("sort random").is_err());
        assert!(parse_input("dance").is_err());
    }

    #[test]
    fn renders_page_and_footer() {
        let mut state = DiscoveryState::default();
        state.displayed = (0..12).map(|i| station(&format!("Station {i}"))).collect();
        state.results = state.displayed.clone();
        state.page = page_view(&state.displayed, 2);

        let text = render(&state);
        assert!(text.contains("country: all"));
        assert!(text.contains("  1. Station 10  (France · MP3 · 128 kbps)"));
        assert!(text.contains("page 2/2 · 12 stations · prev"));
        assert!(!text.contains("· next"));
    }

    #[test]
    fn renders_empty_result_as_no_results() {
        let state = DiscoveryState {
            page: page_view(&[], 1),
            ..DiscoveryState::default()
        };
        let text = render(&state);
        assert!(text.contains("No results."));
        assert!(!text.contains("page "));
    }

    #[test]
    fn renders_catalog_failure_next_to_results() {
        let displayed = vec![station("Jazz FM")];
        let state = DiscoveryState {
            metadata_error: Some(DiscoveryError::metadata("tag: HTTP 503")),
            results: displayed.clone(),
            page: page_view(&displayed, 1),
            displayed,
            ..DiscoveryState::default()
        };
        let text = render(&state);
        assert!(text.contains("failed to load filter options"));
        assert!(text.contains("  1. Jazz FM"));
        assert!(!text.contains("No results."));
    }

    #[test]
    fn subtitle_lists_leading_tags() {
        let mut s = station("Jazz FM");
        s.tags = "jazz, smooth,,lounge,chill".into();
        assert_eq!(
            station_subtitle(&s),
            "France · MP3 · 128 kbps · jazz, smooth, lounge"
        );
    }

    #[test]
    fn ellipsizes_long_names() {
        assert_eq!(ellipsize_chars("abcdef", 3), "abc…");
        assert_eq!(ellipsize_chars("abc", 3), "abc");
    }
}
