use minijinja::{context, Environment};

use crate::types::Product;

const SYSTEM_PROMPT_TEMPLATE: &str = include_str!("prompts/system_prompt.j2");

pub struct SystemPromptContext<'a> {
    pub business_name: &'a str,
    pub business_kind: &'a str,
    pub store_address: &'a str,
    pub catalog_text: &'a str,
}

/// Renders the catalog as one bullet line per product, half-unit price
/// convention included.
pub fn catalog_lines(products: &[Product]) -> String {
    if products.is_empty() {
        return "- No products available".to_string();
    }
    products
        .iter()
        .map(|product| {
            format!(
                "- {}: ${:.2} per 1/2 unit",
                product.name, product.price_half_quantity
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_system_prompt(ctx: &SystemPromptContext<'_>) -> String {
    let mut env = Environment::new();
    if env
        .add_template("system_prompt", SYSTEM_PROMPT_TEMPLATE)
        .is_err()
    {
        return fallback_system_prompt(ctx);
    }

    let Ok(template) = env.get_template("system_prompt") else {
        return fallback_system_prompt(ctx);
    };

    template
        .render(context! {
            business_name => ctx.business_name,
            business_kind => ctx.business_kind,
            store_address => ctx.store_address,
            catalog_text => ctx.catalog_text,
        })
        .unwrap_or_else(|_| fallback_system_prompt(ctx))
}

fn fallback_system_prompt(ctx: &SystemPromptContext<'_>) -> String {
    let mut prompt = format!(
        "You are a customer service agent for {}, a {}.\n\
         You have the following products in your catalog:\n{}\n",
        if ctx.business_name.trim().is_empty() {
            "Our Store"
        } else {
            ctx.business_name.trim()
        },
        if ctx.business_kind.trim().is_empty() {
            "business"
        } else {
            ctx.business_kind.trim()
        },
        ctx.catalog_text,
    );

    if !ctx.store_address.trim().is_empty() {
        prompt.push_str(&format!(
            "\nOur store address for pickup: {}\n",
            ctx.store_address.trim()
        ));
    }

    prompt.push_str(
        "\nPrices shown are for HALF (1/2) of the product. Match the customer's language. \
         Once the order is confirmed and you have a delivery or pickup address, respond ONLY \
         with a JSON object with keys \"products\", \"total_price\" and \"address\".\n",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price: f64) -> Product {
        Product {
            id: 1,
            name: name.to_string(),
            price_half_quantity: price,
        }
    }

    #[test]
    fn catalog_lines_formats_half_unit_prices() {
        let products = vec![product("Empanada de carne", 200.0), product("Pizza", 1500.5)];
        let text = catalog_lines(&products);
        assert_eq!(
            text,
            "- Empanada de carne: $200.00 per 1/2 unit\n- Pizza: $1500.50 per 1/2 unit"
        );
    }

    #[test]
    fn catalog_lines_handles_empty_catalog() {
        assert_eq!(catalog_lines(&[]), "- No products available");
    }

    #[test]
    fn system_prompt_embeds_business_and_catalog() {
        let rendered = render_system_prompt(&SystemPromptContext {
            business_name: "La Esquina",
            business_kind: "empanada shop",
            store_address: "Main St 1",
            catalog_text: "- Empanada: $200.00 per 1/2 unit",
        });
        assert!(rendered.contains("La Esquina"));
        assert!(rendered.contains("empanada shop"));
        assert!(rendered.contains("- Empanada: $200.00 per 1/2 unit"));
        assert!(rendered.contains("Our store address for pickup: Main St 1"));
        assert!(rendered.contains("\"total_price\": total_price"));
    }

    #[test]
    fn system_prompt_omits_pickup_line_without_address() {
        let rendered = render_system_prompt(&SystemPromptContext {
            business_name: "La Esquina",
            business_kind: "empanada shop",
            store_address: "",
            catalog_text: "- Empanada: $200.00 per 1/2 unit",
        });
        assert!(!rendered.contains("Our store address for pickup:"));
    }

    #[test]
    fn fallback_prompt_defaults_blank_fields() {
        let prompt = fallback_system_prompt(&SystemPromptContext {
            business_name: " ",
            business_kind: "",
            store_address: "",
            catalog_text: "- No products available",
        });
        assert!(prompt.contains("Our Store"));
        assert!(prompt.contains("business"));
        assert!(prompt.contains("\"total_price\""));
    }
}
