use log::debug;
use recipe_finder::{FinderConfig, Recipe, RecipeFinder, SearchState, SearchView};
use std::env;
use tokio::io::{self, AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  search <text>     search recipes by name
  category [name]   filter by category and clear the query (no name clears both)
  uncategory        drop the category, keep the query
  categories        list categories
  clear             clear query and category
  show <id>         show recipe details
  random            show a random recipe
  fav <id>          toggle a favorite
  unfav <id>        remove a favorite
  favorites         list favorites
  retry             re-run the current search
  quit              exit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = FinderConfig::load()?;
    debug!("{:#?}", config);
    let mut finder = RecipeFinder::from_config(&config)?;

    let mut updates = finder.subscribe();
    let renderer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            render_state(&state);
        }
    });

    let _ = finder.start().await;

    // Optional deep link: recipe-finder <recipe-id>
    if let Some(id) = env::args().nth(1) {
        match finder.open_by_id(&id).await {
            Some(recipe) => print_recipe(recipe),
            None => println!("No recipe found with id {id}"),
        }
    }

    println!("{HELP}");

    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        let arg = arg.trim();

        match command {
            "" => {}
            "search" | "s" => finder.set_query(arg),
            "category" | "c" => {
                let category = (!arg.is_empty()).then(|| arg.to_string());
                let _ = finder.select_category(category);
            }
            "uncategory" => {
                let _ = finder.clear_category();
            }
            "categories" => {
                for category in finder.categories() {
                    println!("  {}", category.name);
                }
            }
            "clear" => {
                let _ = finder.clear_filters();
            }
            "show" => {
                let opened = match finder.visible_recipe(arg) {
                    Some(recipe) => finder.open(recipe).await,
                    None => finder.open_by_id(arg).await,
                };
                match opened {
                    Some(recipe) => print_recipe(recipe),
                    None => println!("No recipe found with id {arg}"),
                }
            }
            "random" => match finder.surprise().await {
                Some(recipe) => print_recipe(recipe),
                None => println!("Could not fetch a random recipe"),
            },
            "fav" => match finder.visible_recipe(arg) {
                Some(recipe) => {
                    if finder.toggle_favorite(&recipe).await {
                        println!("♥ Saved {}", recipe.name);
                    } else {
                        println!("Removed {} from favorites", recipe.name);
                    }
                }
                None => println!("No visible recipe with id {arg}"),
            },
            "unfav" => {
                if !finder.remove_favorite(arg).await {
                    println!("{arg} is not a favorite");
                }
            }
            "favorites" => {
                if finder.favorites().is_empty() {
                    println!("No favorites yet");
                }
                for recipe in finder.favorites() {
                    println!("  [{}] {}", recipe.id, recipe.name);
                }
            }
            "retry" => {
                let _ = finder.retry();
            }
            "quit" | "exit" | "q" => break,
            _ => println!("Unknown command: {command}\n{HELP}"),
        }
    }

    finder.shutdown();
    renderer.abort();
    Ok(())
}

fn render_state(state: &SearchState) {
    match state.view() {
        SearchView::Failed(message) => {
            println!("Oops! Something went wrong. {message} (type 'retry')")
        }
        SearchView::Loading => println!("Loading..."),
        SearchView::Empty { filtered } => {
            println!("No recipes found. {}", SearchView::empty_hint(filtered))
        }
        SearchView::Results(recipes) => {
            let plural = if recipes.len() == 1 { "" } else { "s" };
            println!("Found {} recipe{}", recipes.len(), plural);
            for recipe in recipes {
                println!(
                    "  [{}] {} - {} / {}",
                    recipe.id, recipe.name, recipe.category, recipe.area
                );
            }
        }
    }
}

fn print_recipe(recipe: &Recipe) {
    println!("\n{}", recipe.name);
    println!("{} | {}", recipe.category, recipe.area);

    let tags = recipe.tag_list();
    if !tags.is_empty() {
        println!("Tags: {}", tags.join(", "));
    }

    println!("\nIngredients:");
    for ingredient in &recipe.ingredients {
        println!("  - {} {}", ingredient.measure, ingredient.name);
    }

    println!("\nInstructions:");
    for (index, step) in recipe.steps().iter().enumerate() {
        println!("  {}. {}", index + 1, step);
    }

    if let Some(video) = &recipe.video_url {
        println!("\nVideo: {video}");
    }
    if let Some(source) = &recipe.source_url {
        println!("Source: {source}");
    }
    println!();
}
