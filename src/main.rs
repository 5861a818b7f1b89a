use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use gonext::config::{AppPaths, HOME_ENV};
use gonext::errors::{GoNextError, Result};
use gonext::health::{HealthItem, run_health_check};
use gonext::photos::PhotoStore;
use gonext::storage::models::{
    Coordinates, MoveDirection, Place, PlaceDraft, SearchFilter, TagTarget, Trip, TripDraft,
    TripPlace, TripPlaceUpdate,
};
use gonext::storage::tags::parse_tag_input;
use gonext::storage::{BackupStore, Database, PlaceStore, SearchStore, TagStore, TripStore};

#[derive(Parser)]
#[command(name = "gonext", version, about = "Offline travel planner")]
struct Cli {
    /// Output results as JSON
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Data directory (defaults to $GONEXT_HOME or ~/.gonext)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage places
    Place {
        #[command(subcommand)]
        action: PlaceAction,
    },
    /// Manage trips
    Trip {
        #[command(subcommand)]
        action: TripAction,
    },
    /// Manage the stops of a trip
    Stop {
        #[command(subcommand)]
        action: StopAction,
    },
    /// Search places, trips, or trip notes
    Search {
        #[arg(value_enum)]
        scope: SearchScope,

        /// Substring to look for
        #[arg(short, long)]
        text: Option<String>,

        /// Required tag (repeatable, or comma separated)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Year to match
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Set or list the tags of a place, trip, or stop
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Export, import, or wipe all data
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
    /// Check that the database and photo storage work offline
    Health,
}

#[derive(Args)]
struct PlaceFields {
    /// Place name
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// Coordinates as "latitude, longitude"
    #[arg(long)]
    coords: Option<String>,

    #[arg(long)]
    visit_later: Option<bool>,

    #[arg(long)]
    liked: Option<bool>,

    /// Comma or semicolon separated tags (replaces existing tags)
    #[arg(long)]
    tags: Option<String>,

    /// Photo file to copy into app storage (repeatable)
    #[arg(long = "photo")]
    photos: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum PlaceAction {
    /// List places, newest first
    List,
    /// Show one place
    Show { id: i64 },
    /// Create a place
    Add(PlaceFields),
    /// Change a place; omitted fields keep their value
    Edit {
        id: i64,
        #[command(flatten)]
        fields: PlaceFields,
    },
    /// Delete a place and its trip stops
    Delete { id: i64 },
}

#[derive(Args)]
struct TripFields {
    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// Start date, e.g. 2026-04-01
    #[arg(long)]
    start: Option<String>,

    /// End date
    #[arg(long)]
    end: Option<String>,

    /// Mark as the current trip
    #[arg(long)]
    current: Option<bool>,

    /// Comma or semicolon separated tags (replaces existing tags)
    #[arg(long)]
    tags: Option<String>,
}

#[derive(Subcommand)]
enum TripAction {
    /// List trips, newest first
    List,
    /// Show a trip with its route
    Show { id: i64 },
    /// Create a trip
    Add(TripFields),
    /// Change a trip; omitted fields keep their value
    Edit {
        id: i64,
        #[command(flatten)]
        fields: TripFields,
    },
    /// Delete a trip and its stops
    Delete { id: i64 },
    /// Show the current trip
    Current,
    /// Show the next unvisited stop (of the current trip by default)
    Next { trip_id: Option<i64> },
}

#[derive(Subcommand)]
enum StopAction {
    /// Append a place to a trip's route
    Add { trip_id: i64, place_id: i64 },
    /// Mark a stop as visited
    Visit {
        id: i64,
        /// Mark as not visited instead
        #[arg(short, long)]
        undo: bool,
    },
    /// Replace a stop's notes (empty text clears them)
    Note { id: i64, text: String },
    /// Attach a photo to a stop
    Photo { id: i64, path: PathBuf },
    /// Move a stop up or down the route
    Move {
        id: i64,
        #[arg(value_enum)]
        direction: Direction,
    },
    /// Replace a stop's tags
    Tags { id: i64, tags: String },
    /// Remove a stop from its trip
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum TagAction {
    /// Replace the tags of an item
    Set {
        #[arg(value_enum)]
        kind: TagKind,
        id: i64,
        /// Comma or semicolon separated tags; empty removes all
        tags: String,
    },
    /// List the tags of an item
    List {
        #[arg(value_enum)]
        kind: TagKind,
        id: i64,
    },
}

#[derive(Subcommand)]
enum BackupAction {
    /// Write a JSON backup to a file or stdout
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all data with a JSON backup
    Import { file: PathBuf },
    /// Delete all data and photos
    Clear {
        /// Skip the safety check
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SearchScope {
    Places,
    Trips,
    Notes,
}

#[derive(Clone, Copy, ValueEnum)]
enum TagKind {
    Place,
    Trip,
    Stop,
}

impl TagKind {
    fn target(self, id: i64) -> TagTarget {
        match self {
            TagKind::Place => TagTarget::Place(id),
            TagKind::Trip => TagTarget::Trip(id),
            TagKind::Stop => TagTarget::TripPlace(id),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Up,
    Down,
}

impl From<Direction> for MoveDirection {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Up => MoveDirection::Up,
            Direction::Down => MoveDirection::Down,
        }
    }
}

#[derive(Serialize)]
struct StatusResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
}

#[derive(Serialize)]
struct PlaceView {
    #[serde(flatten)]
    place: Place,
    tags: Vec<String>,
}

#[derive(Serialize)]
struct TripView {
    #[serde(flatten)]
    trip: Trip,
    tags: Vec<String>,
    stops: Vec<StopView>,
}

#[derive(Serialize)]
struct StopView {
    #[serde(flatten)]
    stop: TripPlace,
    place_name: Option<String>,
    tags: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        if !e.is_user_facing() {
            tracing::error!(error = ?e, "command failed");
        }
        if json {
            eprintln!("{}", serde_json::json!({"error": e.to_string()}));
        } else {
            eprintln!("error: {}", e);
        }
        process::exit(1);
    }
}

struct Context {
    db: Database,
    photos: PhotoStore,
    json: bool,
}

fn run(cli: Cli) -> Result<()> {
    let from_env = std::env::var_os(HOME_ENV).map(PathBuf::from);
    let paths = AppPaths::resolve(cli.home, from_env);
    let ctx = Context {
        db: Database::new(&paths.db_path),
        photos: PhotoStore::from_paths(&paths),
        json: cli.json,
    };

    match cli.command {
        Commands::Place { action } => cmd_place(&ctx, action),
        Commands::Trip { action } => cmd_trip(&ctx, action),
        Commands::Stop { action } => cmd_stop(&ctx, action),
        Commands::Search { scope, text, tags, year } => {
            let filter = SearchFilter {
                text,
                tags: tags.iter().flat_map(|t| parse_tag_input(t)).collect(),
                year,
            };
            cmd_search(&ctx, scope, &filter)
        }
        Commands::Tag { action } => cmd_tag(&ctx, action),
        Commands::Backup { action } => cmd_backup(&ctx, action),
        Commands::Health => cmd_health(&ctx),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn report(ctx: &Context, message: String, id: Option<i64>, success: bool) -> Result<()> {
    if ctx.json {
        print_json(&StatusResponse { success, message, id })
    } else {
        println!("{}", message);
        Ok(())
    }
}

fn not_found(kind: &str, id: i64) -> GoNextError {
    GoNextError::NotFound(format!("{} #{} not found", kind, id))
}

// --- Places ---

fn cmd_place(ctx: &Context, action: PlaceAction) -> Result<()> {
    match action {
        PlaceAction::List => {
            let places = ctx.db.with(|s| s.list_places())?;
            if ctx.json {
                return print_json(&places);
            }
            if places.is_empty() {
                println!("No places yet.");
            }
            for place in &places {
                print_place_row(place);
            }
            Ok(())
        }
        PlaceAction::Show { id } => {
            let view = ctx.db.with(|s| {
                let place = s.get_place(id)?.ok_or_else(|| not_found("Place", id))?;
                let tags = s.list_tags(TagTarget::Place(id))?;
                Ok(PlaceView { place, tags })
            })?;
            if ctx.json {
                return print_json(&view);
            }
            print_place_detail(&view);
            Ok(())
        }
        PlaceAction::Add(fields) => {
            let name = fields.name.clone().unwrap_or_default();
            let draft = PlaceDraft {
                name,
                ..Default::default()
            };
            let id = save_place_fields(ctx, draft, fields)?;
            report(ctx, format!("Created place #{}.", id), Some(id), true)
        }
        PlaceAction::Edit { id, fields } => {
            let existing = ctx
                .db
                .with(|s| s.get_place(id))?
                .ok_or_else(|| not_found("Place", id))?;
            let draft = PlaceDraft {
                id: Some(id),
                name: existing.name,
                description: existing.description,
                visit_later: existing.visit_later,
                liked: existing.liked,
                coordinates: existing.coordinates,
                photos: existing.photos,
            };
            save_place_fields(ctx, draft, fields)?;
            report(ctx, format!("Updated place #{}.", id), Some(id), true)
        }
        PlaceAction::Delete { id } => {
            let found = ctx.db.with(|s| s.delete_place(id))?;
            let message = if found {
                format!("Deleted place #{}.", id)
            } else {
                format!("Place #{} not found.", id)
            };
            report(ctx, message, Some(id), found)
        }
    }
}

/// Applies command-line fields on top of `draft`, validating everything
/// before any photo is copied or row written.
fn save_place_fields(ctx: &Context, mut draft: PlaceDraft, fields: PlaceFields) -> Result<i64> {
    if let Some(name) = fields.name {
        draft.name = name;
    }
    if let Some(description) = fields.description {
        draft.description = Some(description);
    }
    if let Some(coords) = fields.coords {
        draft.coordinates = Coordinates::parse(&coords)?;
    }
    if let Some(visit_later) = fields.visit_later {
        draft.visit_later = visit_later;
    }
    if let Some(liked) = fields.liked {
        draft.liked = liked;
    }
    if draft.name.trim().is_empty() {
        return Err(GoNextError::InvalidInput("place name is required (--name)".into()));
    }
    let tags = fields.tags.as_deref().map(parse_tag_input);
    let staged = ctx.photos.stage_all(&fields.photos)?;
    for photo in &staged {
        if !draft.photos.contains(&photo.path) {
            draft.photos.push(photo.path.clone());
        }
    }

    let saved = ctx.db.with(|s| {
        s.atomically(|s| {
            let id = s.save_place(draft)?;
            if let Some(tags) = &tags {
                s.set_tags(TagTarget::Place(id), tags)?;
            }
            Ok(id)
        })
    });
    if saved.is_err() {
        ctx.photos.discard(&staged);
    }
    saved
}

// --- Trips ---

fn cmd_trip(ctx: &Context, action: TripAction) -> Result<()> {
    match action {
        TripAction::List => {
            let trips = ctx.db.with(|s| s.list_trips())?;
            if ctx.json {
                return print_json(&trips);
            }
            if trips.is_empty() {
                println!("No trips yet.");
            }
            for trip in &trips {
                print_trip_row(trip);
            }
            Ok(())
        }
        TripAction::Show { id } => {
            let view = ctx.db.with(|s| {
                let trip = s.get_trip(id)?.ok_or_else(|| not_found("Trip", id))?;
                trip_view(s, trip)
            })?;
            if ctx.json {
                return print_json(&view);
            }
            print_trip_detail(&view);
            Ok(())
        }
        TripAction::Add(fields) => {
            let draft = TripDraft {
                title: fields.title.clone().unwrap_or_default(),
                ..Default::default()
            };
            let id = save_trip_fields(ctx, draft, fields)?;
            report(ctx, format!("Created trip #{}.", id), Some(id), true)
        }
        TripAction::Edit { id, fields } => {
            let existing = ctx
                .db
                .with(|s| s.get_trip(id))?
                .ok_or_else(|| not_found("Trip", id))?;
            let draft = TripDraft {
                id: Some(id),
                title: existing.title,
                description: existing.description,
                start_date: existing.start_date,
                end_date: existing.end_date,
                current: existing.current,
            };
            save_trip_fields(ctx, draft, fields)?;
            report(ctx, format!("Updated trip #{}.", id), Some(id), true)
        }
        TripAction::Delete { id } => {
            let found = ctx.db.with(|s| s.delete_trip(id))?;
            let message = if found {
                format!("Deleted trip #{}.", id)
            } else {
                format!("Trip #{} not found.", id)
            };
            report(ctx, message, Some(id), found)
        }
        TripAction::Current => {
            let view = ctx.db.with(|s| match s.get_current_trip()? {
                Some(trip) => trip_view(s, trip).map(Some),
                None => Ok(None),
            })?;
            match view {
                Some(view) if ctx.json => print_json(&view),
                Some(view) => {
                    print_trip_detail(&view);
                    Ok(())
                }
                None => report(ctx, "No current trip.".into(), None, false),
            }
        }
        TripAction::Next { trip_id } => {
            let next = ctx.db.with(|s| {
                let trip_id = match trip_id {
                    Some(id) => id,
                    None => match s.get_current_trip()? {
                        Some(trip) => trip.id,
                        None => return Ok(None),
                    },
                };
                match s.get_next_unvisited_place(trip_id)? {
                    Some(stop) => stop_view(s, stop).map(Some),
                    None => Ok(None),
                }
            })?;
            match next {
                Some(view) if ctx.json => print_json(&view),
                Some(view) => {
                    print_stop_row(&view);
                    Ok(())
                }
                None => report(ctx, "Nothing left to visit.".into(), None, false),
            }
        }
    }
}

fn save_trip_fields(ctx: &Context, mut draft: TripDraft, fields: TripFields) -> Result<i64> {
    if let Some(title) = fields.title {
        draft.title = title;
    }
    if let Some(description) = fields.description {
        draft.description = Some(description);
    }
    if let Some(start) = fields.start {
        draft.start_date = Some(start);
    }
    if let Some(end) = fields.end {
        draft.end_date = Some(end);
    }
    if let Some(current) = fields.current {
        draft.current = current;
    }
    let tags = fields.tags.as_deref().map(parse_tag_input);

    ctx.db.with(|s| {
        s.atomically(|s| {
            let id = s.save_trip(draft)?;
            if let Some(tags) = &tags {
                s.set_tags(TagTarget::Trip(id), tags)?;
            }
            Ok(id)
        })
    })
}

fn trip_view<S>(s: &S, trip: Trip) -> Result<TripView>
where
    S: TripStore + PlaceStore + TagStore,
{
    let tags = s.list_tags(TagTarget::Trip(trip.id))?;
    let stops = s
        .list_trip_places(trip.id)?
        .into_iter()
        .map(|stop| stop_view(s, stop))
        .collect::<Result<Vec<_>>>()?;
    Ok(TripView { trip, tags, stops })
}

fn stop_view<S>(s: &S, stop: TripPlace) -> Result<StopView>
where
    S: PlaceStore + TagStore,
{
    let place_name = s.get_place(stop.place_id)?.map(|p| p.name);
    let tags = s.list_tags(TagTarget::TripPlace(stop.id))?;
    Ok(StopView { stop, place_name, tags })
}

// --- Stops ---

fn cmd_stop(ctx: &Context, action: StopAction) -> Result<()> {
    match action {
        StopAction::Add { trip_id, place_id } => {
            let id = ctx.db.with(|s| {
                s.get_trip(trip_id)?.ok_or_else(|| not_found("Trip", trip_id))?;
                s.get_place(place_id)?.ok_or_else(|| not_found("Place", place_id))?;
                s.add_place_to_trip(trip_id, place_id)
            })?;
            report(ctx, format!("Added stop #{} to trip #{}.", id, trip_id), Some(id), true)
        }
        StopAction::Visit { id, undo } => {
            ctx.db.with(|s| s.set_visited(id, !undo))?;
            let message = if undo {
                format!("Stop #{} marked as not visited.", id)
            } else {
                format!("Stop #{} marked as visited.", id)
            };
            report(ctx, message, Some(id), true)
        }
        StopAction::Note { id, text } => {
            ctx.db.with(|s| {
                s.update_trip_place(id, TripPlaceUpdate {
                    notes: Some(Some(text)),
                    ..Default::default()
                })
            })?;
            report(ctx, format!("Updated notes of stop #{}.", id), Some(id), true)
        }
        StopAction::Photo { id, path } => {
            let stop = ctx
                .db
                .with(|s| s.get_trip_place(id))?
                .ok_or_else(|| not_found("Stop", id))?;
            let staged = ctx.photos.stage(&path)?;
            let mut photos = stop.photos;
            if !photos.contains(&staged.path) {
                photos.push(staged.path.clone());
            }
            let updated = ctx.db.with(|s| {
                s.update_trip_place(id, TripPlaceUpdate {
                    photos: Some(photos),
                    ..Default::default()
                })
            });
            if let Err(e) = updated {
                ctx.photos.discard(&[staged]);
                return Err(e);
            }
            report(ctx, format!("Attached photo to stop #{}.", id), Some(id), true)
        }
        StopAction::Move { id, direction } => {
            let moved = ctx.db.with(|s| s.move_trip_place(id, direction.into()))?;
            let message = if moved {
                format!("Moved stop #{}.", id)
            } else {
                format!("Stop #{} is already at the end of the route.", id)
            };
            report(ctx, message, Some(id), moved)
        }
        StopAction::Tags { id, tags } => cmd_tag(ctx, TagAction::Set {
            kind: TagKind::Stop,
            id,
            tags,
        }),
        StopAction::Remove { id } => {
            let found = ctx.db.with(|s| s.remove_trip_place(id))?;
            let message = if found {
                format!("Removed stop #{}.", id)
            } else {
                format!("Stop #{} not found.", id)
            };
            report(ctx, message, Some(id), found)
        }
    }
}

// --- Tags ---

fn cmd_tag(ctx: &Context, action: TagAction) -> Result<()> {
    match action {
        TagAction::Set { kind, id, tags } => {
            let target = kind.target(id);
            let tags = parse_tag_input(&tags);
            ctx.db.with(|s| {
                let exists = match target {
                    TagTarget::Place(id) => s.get_place(id)?.is_some(),
                    TagTarget::Trip(id) => s.get_trip(id)?.is_some(),
                    TagTarget::TripPlace(id) => s.get_trip_place(id)?.is_some(),
                };
                if !exists {
                    return Err(not_found("Item", id));
                }
                s.set_tags(target, &tags)
            })?;
            report(ctx, format!("Tags of #{}: {}", id, tags.join(", ")), Some(id), true)
        }
        TagAction::List { kind, id } => {
            let tags = ctx.db.with(|s| s.list_tags(kind.target(id)))?;
            if ctx.json {
                return print_json(&tags);
            }
            for tag in &tags {
                println!("{}", tag);
            }
            Ok(())
        }
    }
}

// --- Search ---

fn cmd_search(ctx: &Context, scope: SearchScope, filter: &SearchFilter) -> Result<()> {
    match scope {
        SearchScope::Places => {
            let places = ctx.db.with(|s| s.search_places(filter))?;
            if ctx.json {
                return print_json(&places);
            }
            if places.is_empty() {
                println!("No matching places.");
            }
            places.iter().for_each(print_place_row);
        }
        SearchScope::Trips => {
            let trips = ctx.db.with(|s| s.search_trips(filter))?;
            if ctx.json {
                return print_json(&trips);
            }
            if trips.is_empty() {
                println!("No matching trips.");
            }
            trips.iter().for_each(print_trip_row);
        }
        SearchScope::Notes => {
            let notes = ctx.db.with(|s| s.search_trip_notes(filter))?;
            if ctx.json {
                return print_json(&notes);
            }
            if notes.is_empty() {
                println!("No matching notes.");
            }
            for note in &notes {
                let when = note
                    .visit_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:>4} {:<24} {:<24} {:>10}  {}",
                    note.trip_place_id,
                    truncate_chars(&note.trip_title, 24),
                    truncate_chars(&note.place_name, 24),
                    when,
                    note.notes.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}

// --- Backup ---

fn cmd_backup(ctx: &Context, action: BackupAction) -> Result<()> {
    match action {
        BackupAction::Export { output } => {
            let json = ctx.db.with(|s| s.export_database())?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    report(ctx, format!("Exported backup to {}.", path.display()), None, true)
                }
                None => {
                    println!("{}", json);
                    Ok(())
                }
            }
        }
        BackupAction::Import { file } => {
            let raw = std::fs::read_to_string(&file)?;
            ctx.db.with(|s| s.import_database(&raw))?;
            report(ctx, format!("Imported backup from {}.", file.display()), None, true)
        }
        BackupAction::Clear { yes } => {
            if !yes {
                return Err(GoNextError::InvalidInput(
                    "this deletes every place, trip, and photo; rerun with --yes".into(),
                ));
            }
            ctx.db.with(|s| s.clear_database())?;
            ctx.photos.clear()?;
            report(ctx, "Cleared all data.".into(), None, true)
        }
    }
}

fn cmd_health(ctx: &Context) -> Result<()> {
    let items = match ctx.db.with(|s| Ok(run_health_check(s, &ctx.photos))) {
        Ok(items) => items,
        Err(e) => vec![
            HealthItem {
                label: "Local database",
                ok: false,
                details: e.to_string(),
            },
            HealthItem {
                label: "Photo storage",
                ok: ctx.photos.count().is_ok(),
                details: String::new(),
            },
        ],
    };
    if ctx.json {
        return print_json(&items);
    }
    for item in &items {
        let mark = if item.ok { "ok  " } else { "FAIL" };
        println!("[{}] {}: {}", mark, item.label, item.details);
    }
    Ok(())
}

// --- Output ---

fn print_place_row(place: &Place) {
    let flags = format!(
        "{}{}",
        if place.liked { "*" } else { " " },
        if place.visit_later { "L" } else { " " }
    );
    println!(
        "{:>4} {} {}  {}",
        place.id,
        flags,
        place.created_at.format("%Y-%m-%d"),
        truncate_chars(&place.name, 60)
    );
}

fn print_place_detail(view: &PlaceView) {
    let place = &view.place;
    println!("ID:          {}", place.id);
    println!("Name:        {}", place.name);
    println!("Created:     {}", place.created_at.format("%Y-%m-%d %H:%M"));
    println!("Liked:       {}", place.liked);
    println!("Visit later: {}", place.visit_later);
    match &place.coordinates {
        Some(Coordinates::Decimal { lat, lng }) => println!("Coordinates: {}, {}", lat, lng),
        Some(Coordinates::Text(text)) => println!("Coordinates: {}", text),
        None => {}
    }
    if !view.tags.is_empty() {
        println!("Tags:        {}", view.tags.join(", "));
    }
    for photo in &place.photos {
        println!("Photo:       {}", photo);
    }
    if let Some(description) = &place.description {
        println!("─────────────────────────");
        println!("{}", description);
    }
}

fn print_trip_row(trip: &Trip) {
    let current = if trip.current { ">" } else { " " };
    let dates = match (&trip.start_date, &trip.end_date) {
        (Some(start), Some(end)) => format!("{} – {}", start, end),
        (Some(start), None) => start.clone(),
        _ => String::new(),
    };
    println!(
        "{:>4} {} {:<40} {}",
        trip.id,
        current,
        truncate_chars(&trip.title, 40),
        dates
    );
}

fn print_trip_detail(view: &TripView) {
    let trip = &view.trip;
    println!("ID:      {}", trip.id);
    println!("Title:   {}", trip.title);
    println!("Current: {}", trip.current);
    if let Some(start) = &trip.start_date {
        println!("Start:   {}", start);
    }
    if let Some(end) = &trip.end_date {
        println!("End:     {}", end);
    }
    if !view.tags.is_empty() {
        println!("Tags:    {}", view.tags.join(", "));
    }
    if let Some(description) = &trip.description {
        println!("{}", description);
    }
    println!("─────────────────────────");
    if view.stops.is_empty() {
        println!("No stops yet.");
    }
    for stop in &view.stops {
        print_stop_row(stop);
    }
}

fn print_stop_row(view: &StopView) {
    let stop = &view.stop;
    let mark = if stop.visited { "x" } else { " " };
    let name = view.place_name.as_deref().unwrap_or("?");
    let tags = if view.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", view.tags.join(", "))
    };
    println!("{:>4} [{}] {:>3}. {}{}", stop.id, mark, stop.order_index, name, tags);
    if let Some(notes) = &stop.notes {
        println!("          {}", notes);
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
