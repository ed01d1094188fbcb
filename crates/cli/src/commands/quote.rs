//! Quote CLI command

use anyhow::Result;
use colored::Colorize;
use shipping_lib::ShippingRequest;

use crate::client::ApiClient;
use crate::output::{format_currency, print_json, OutputFormat};

/// Order fields taken from the command line
#[derive(Debug, Clone)]
pub struct QuoteArgs {
    pub num_items: i64,
    pub estado: String,
    pub subtotal: Option<f64>,
    pub total: Option<f64>,
    pub total_quantity: Option<i64>,
}

impl QuoteArgs {
    pub fn to_request(&self) -> ShippingRequest {
        let mut request = ShippingRequest::new(self.num_items, self.estado.clone());
        if let Some(subtotal) = self.subtotal {
            request = request.with_subtotal(subtotal);
        }
        if let Some(total) = self.total {
            request = request.with_total(total);
        }
        if let Some(total_quantity) = self.total_quantity {
            request = request.with_total_quantity(total_quantity);
        }
        request
    }
}

/// Request a quote and print it
pub async fn get_quote(client: &ApiClient, args: &QuoteArgs, format: OutputFormat) -> Result<()> {
    let quote = client.quote(&args.to_request()).await?;

    match format {
        OutputFormat::Json => print_json(&quote)?,
        OutputFormat::Table => {
            println!("{}", "Shipping Quote".bold());
            println!("{}", "=".repeat(40));
            println!("Estado:        {}", quote.estado.cyan());
            println!("Items:         {}", quote.num_items);
            println!("Subtotal:      {}", format_currency(quote.subtotal));
            println!();
            println!(
                "{} {}",
                "Shipping cost:".bold(),
                format_currency(quote.costo_envio).green().bold()
            );
        }
    }

    Ok(())
}
