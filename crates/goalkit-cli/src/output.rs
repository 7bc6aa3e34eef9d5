use goalkit_core::report::Rendered;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_rendered(rendered: &Rendered) -> anyhow::Result<()> {
    match rendered {
        Rendered::Json(value) => print_json(value),
        Rendered::Text(text) => {
            print!("{text}");
            Ok(())
        }
    }
}
