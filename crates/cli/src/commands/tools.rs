//! `majordome tools` — List the built-in tool catalogue, or detail one tool.

use majordome_config::AppConfig;
use majordome_tools::BuiltinTool;

pub fn run(config: &AppConfig, name: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(name) = name {
        return show(config, name);
    }

    let registry = majordome_tools::registry_from_config(&config.tools);

    println!("🔧 Available tools ({})", registry.len());
    println!();
    for def in registry.definitions() {
        let positional = registry.positional_argument(&def.name).unwrap_or("-");
        println!("  {:<12} {}", def.name, def.description);
        println!("  {:<12} positional: {positional}", "");
        if let Some(props) = def.parameters["properties"].as_object()
            && !props.is_empty()
        {
            let names: Vec<&str> = props.keys().map(String::as_str).collect();
            println!("  {:<12} arguments:  {}", "", names.join(", "));
        }
    }

    Ok(())
}

fn show(config: &AppConfig, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let tool = name.parse::<BuiltinTool>()?.build(&config.tools);

    println!("🔧 {}", tool.name());
    println!("   {}", tool.description());
    println!();
    println!("{}", serde_json::to_string_pretty(&tool.parameters_schema())?);

    Ok(())
}
