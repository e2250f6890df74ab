//! Built-in sample catalogs.

use std::path::Path;

use tracing::info;

use catalog_core::{CatalogError, Product, Result};

struct SampleEntry {
    name: &'static str,
    description: &'static str,
    sku: &'static str,
    price: f64,
    tags: &'static [&'static str],
    available: bool,
}

impl SampleEntry {
    fn to_product(&self) -> Product {
        Product::new(self.name, self.description, self.sku, self.price, self.tags)
            .with_available(self.available)
    }
}

/// Names of the sample datasets, by index.
pub const SAMPLE_DATASETS: [&str; 2] = ["cafe", "devices"];

const CAFE_MENU: &[SampleEntry] = &[
    SampleEntry {
        name: "Americano",
        description: "Pure black coffee, no milk or sugar or anything. Very strong in its bitterness.",
        sku: "CNB0001",
        price: 9.99,
        tags: &["black", "coffee", "sugarless", "dairyless"],
        available: false,
    },
    SampleEntry {
        name: "Latte",
        description: "A shot of coffee mixed with a shot of milk (other milks available) in a roughly equal ratio. Preserves the bitterness and other tones of the coffee while balancing it out with sweetness and creaminess.",
        sku: "CNM0010",
        price: 10.89,
        tags: &["white", "coffee", "dairy", "other milk available"],
        available: true,
    },
    SampleEntry {
        name: "Affogato",
        description: "A cup of espresso with some milk in it. The rest of the diary content comes from a scoop of vanilla ice cream on top. It adds a pleasant sweetness to the coffee as well as a novel vanilla flavour.",
        sku: "CIM0055",
        price: 16.5,
        tags: &["white", "coffee", "dairy", "ice cream vanilla"],
        available: true,
    },
    SampleEntry {
        name: "Mocha",
        description: "A mix of roughly equal parts milk, coffee and choclate, combining the caffeine boost and pleasant bitterness of coffee with the sweet earthiness of chocolate.",
        sku: "CNMh011",
        price: 15.0,
        tags: &["white", "coffee", "chocolate", "dairy"],
        available: true,
    },
    SampleEntry {
        name: "Matcha Latte",
        description: "A drink made from crushed and treated green tea leaves imported straight from Japan mixed with a dash of milk. It has a strong umami flavour, and an equally strong bright green colour. Very popular in contemporary times.",
        sku: "TgNM0125",
        price: 9.99,
        tags: &["green", "tea", "matcha", "leaves", "umami", "dairy"],
        available: true,
    },
    SampleEntry {
        name: "Hot Chocolate",
        description: "Chocolate powder dissolved in water, with a good amount of milk mixed in. An age-old classic for cold times.",
        sku: "HNM0001",
        price: 6.99,
        tags: &["no coffee", "dairy", "other milks available", "hot", "chocolate"],
        available: true,
    },
    SampleEntry {
        name: "Water",
        description: "Plain water. Comes hot, cold or lukwarm.",
        sku: "WNN0001",
        price: 2.0,
        tags: &["no coffee", "no dairy", "plain", "any temperature", "water"],
        available: true,
    },
    SampleEntry {
        name: "Green Tea",
        description: "Although this and matcha are made of the same kind of leaves, this is made by steeping the leaves while they are still contained in a bag. Has a weaker and more subtle flavour than matcha, best enjoyed without milk.",
        sku: "TgNN0001",
        price: 8.25,
        tags: &["green", "tea", "leaves", "hot", "weak", "subtle"],
        available: true,
    },
    SampleEntry {
        name: "Earl Grey Tea",
        description: "One of the most ancient and revered drinks in the world, with a smooth flavour, usually with a sugar cube or two mixed in.",
        sku: "TNS0001",
        price: 5.45,
        tags: &["earl grey", "tea", "dairyless", "leaves", "hot"],
        available: true,
    },
    SampleEntry {
        name: "Melted Cheese",
        description: "A pot of freshly melted cheese of various kinds (enquire within for the exact mix), bubbling and boiling. The combination of the myriad of flavours creates a truly unique culinary exprience.",
        sku: "ONN0101",
        price: 15.9,
        tags: &["no coffee", "no tea", "cheese", "oddities", "no nothing except cheese", "no milk", "no sugar"],
        available: true,
    },
    SampleEntry {
        name: "Mayonnaise",
        description: "Pure mayonnaise in a large glass. Not suitable for thise with egg allergies. Although slightly gelatinous, mayonnaise is so smooth and creamy that the mere sensation of it sliding down your throat when you swallow is delightful.",
        sku: "ONN0001",
        price: 13.99,
        tags: &["no coffee", "no tea", "mayonnaise", "oddities", "no nothing except mayo", "no milk", "no sugar"],
        available: true,
    },
    SampleEntry {
        name: "Croque Monsieur",
        description: "The French version of a ham-and-cheese sandiwich, so of course it had to be overcomplicated. Thick slices of chicken ham layered between multiple cheeses (enquire within for details) and leaves of lettuce, topped with a bechamel sauce.",
        sku: "SHC0090",
        price: 12.9,
        tags: &["pastry", "bread", "ham", "cheese", "breakfast", "milk", "sauce"],
        available: false,
    },
    SampleEntry {
        name: "Croque Madame",
        description: "An even better version of the already eminent Croque Monsieur. The addition of a drippy poached egg on top of the bread completes the picture.",
        sku: "SHC0091",
        price: 13.99,
        tags: &["pastry", "bread", "ham", "cheese", "breakfast", "milk", "sauce", "egg"],
        available: true,
    },
    SampleEntry {
        name: "Croissant",
        description: "The most recognisable French pastry. Dozens of flaky layers of pastry encased within a crispy shell of the immediately recognisable shape.",
        sku: "BNC0005",
        price: 4.0,
        tags: &["pastry", "bread", "plain", "breakfast"],
        available: true,
    },
    SampleEntry {
        name: "French Toast",
        description: "A pastry so excellent, so delicious, they named a whole country after it. Thick slices of white bread dipped in beaten egg and fried until yellow-brown. Comes with butter and syrup on the side to spread. Enquire within for a cheese spread.",
        sku: "BNE5000",
        price: 15.85,
        tags: &["pastry", "bread", "cheese", "breakfast", "syrup", "butter", "egg"],
        available: true,
    },
    SampleEntry {
        name: "Big Lunch",
        description: "The noontime counterpart of the Big Breakfast. Comes with all the usual trappings, plus a chicken drumstick and bowl of rice.",
        sku: "AAA6327",
        price: 26.3,
        tags: &["lunch", "rice", "meat", "chicken", "egg", "sausage", "mushroom", "cherry tomato"],
        available: true,
    },
    SampleEntry {
        name: "Shrimp Fried Rice",
        description: "Prepared by our finest shrimp chefs. A large plate of rice expertly fried with egg, assorted vegetables, and shrimp.",
        sku: "RAE0400",
        price: 16.0,
        tags: &["rice", "egg", "vegetables", "plain", "shrimp", "lunch"],
        available: true,
    },
    SampleEntry {
        name: "Spagetthi Bolognaise",
        description: "Italian noodles in the classic Bolognaise style, that is, a rich tomato sauce. Slices of chicken are added for protein.",
        sku: "NCT0342",
        price: 19.1,
        tags: &["noodles", "pasta", "tomato", "sauce", "lunch", "chicken"],
        available: true,
    },
    SampleEntry {
        name: "Carbonara Pasta",
        description: "Another widely-loved way of cooking pasta. Served denched in an off-white gooey sauce made from milk and sugar, with strips of salty duck placed on top.",
        sku: "NDC8234",
        price: 21.05,
        tags: &["noodles", "pasta", "milk", "sugar", "sauce", "lunch", "duck"],
        available: true,
    },
    SampleEntry {
        name: "Smoked Salmon",
        description: "A single, massive fillet of smoked salmon, seasoned to perfection. Half a lemon is provided to squeeze on top.",
        sku: "FNN0237",
        price: 32.95,
        tags: &["fish", "smoked", "salmon", "dinner", "lemon", "seasoned"],
        available: true,
    },
];

const DEVICES: &[SampleEntry] = &[
    SampleEntry {
        name: "iPhone 17 Pro",
        description: "iPhone 17, newest version, with increased capabilities from Pro specification",
        sku: "APP1700",
        price: 13.99,
        tags: &["apple", "phone"],
        available: true,
    },
    SampleEntry {
        name: "iPhone 16",
        description: "Second-last generation of iPhone, standard model.",
        sku: "APN1600",
        price: 13.99,
        tags: &["apple", "phone"],
        available: true,
    },
    SampleEntry {
        name: "iPhone 13",
        description: "Older version of iPhone, standard model.",
        sku: "APN1300",
        price: 13.99,
        tags: &["apple", "phone"],
        available: true,
    },
    SampleEntry {
        name: "iPhone X Pro Max",
        description: "Highest specs (Pro Max) version of 10th iPhone, named X after the Roman numeral.",
        sku: "APPm1000",
        price: 13.99,
        tags: &["apple", "phone"],
        available: true,
    },
    SampleEntry {
        name: "iPad Air 2",
        description: "Second-generation small Apple tablet",
        sku: "ATA0200",
        price: 13.99,
        tags: &["apple", "tablet"],
        available: true,
    },
    SampleEntry {
        name: "iPad Air",
        description: "First-generation small Apple tablet",
        sku: "ATA0000",
        price: 13.99,
        tags: &["apple", "tablet"],
        available: true,
    },
    SampleEntry {
        name: "Samsung Galaxy A25",
        description: "Newest mobile phone from Samsung Galaxy mid-series (A)",
        sku: "SPA0250",
        price: 13.99,
        tags: &["samsung", "phone"],
        available: true,
    },
    SampleEntry {
        name: "Samsung Galaxy A24",
        description: "Newest mobile phone from Samsung Galaxy mid-series (A)",
        sku: "SPA0240",
        price: 13.99,
        tags: &["samsung", "phone"],
        available: true,
    },
    SampleEntry {
        name: "Samsung Galaxy A20",
        description: "Older mobile phone from Samsung Galaxy mid-series (A)",
        sku: "SPA0200",
        price: 13.99,
        tags: &["samsung", "phone"],
        available: true,
    },
    SampleEntry {
        name: "Samsung Galaxy A15",
        description: "Old mobile phone from Samsung Galaxy mid-series (A)",
        sku: "SPA0150",
        price: 13.99,
        tags: &["samsung", "phone"],
        available: true,
    },
    SampleEntry {
        name: "Samsung Galaxy S30",
        description: "Newest mobile phone from Samsung Galaxy high-end series (S)",
        sku: "SPS3000",
        price: 13.99,
        tags: &["samsung", "phone"],
        available: true,
    },
    SampleEntry {
        name: "Samsung Galaxy S20",
        description: "Older mobile phone from Samsung Galaxy high-end series (S)",
        sku: "SPS2000",
        price: 13.99,
        tags: &["samsung", "phone"],
        available: true,
    },
    SampleEntry {
        name: "Nothing Phone (3a)",
        description: "Newest mobile phone by breakout brand Nothing, known for their complex sci-fi-inspired designs.",
        sku: "OPN0031",
        price: 13.99,
        tags: &["nothing", "phone"],
        available: true,
    },
    SampleEntry {
        name: "Nokia 1200",
        description: "Nokia phone from old storage, will break the ground if you drop it.",
        sku: "NHN1200",
        price: 13.99,
        tags: &["nokia", "phone"],
        available: true,
    },
    SampleEntry {
        name: "Nokia 1110",
        description: "Nokia phone from old storage, will break the ground if you drop it.",
        sku: "NHN1100",
        price: 13.99,
        tags: &["nokia", "phone"],
        available: true,
    },
    SampleEntry {
        name: "Samsung Galaxy Tab S10",
        description: "S10 tablet from Samsung",
        sku: "SGT1910",
        price: 13.99,
        tags: &["samsung", "tablet"],
        available: true,
    },
    SampleEntry {
        name: "Samsung Galaxy Tab S7",
        description: "S7 tabler from Samsung",
        sku: "SGT1907",
        price: 13.99,
        tags: &["samsung", "tablet"],
        available: true,
    },
    SampleEntry {
        name: "1 Plus Nord",
        description: "Popular phone from little-known brand 1+ (has many alternate spellings too)",
        sku: "PPN0101",
        price: 13.99,
        tags: &["1 plus", "one plus", "1plus", "oneplus", "phone"],
        available: true,
    },
    SampleEntry {
        name: "Huawei P40",
        description: "Huawei P40 mobile phone",
        sku: "HPN1640",
        price: 13.99,
        tags: &["huawei", "phone"],
        available: true,
    },
    SampleEntry {
        name: "Huawei Mate50",
        description: "Huawei P40 mobile phone",
        sku: "HPM0050",
        price: 13.99,
        tags: &["huawei", "phone"],
        available: true,
    },
];

/// Products of a sample dataset: 0 is a café menu, 1 is phones and tablets.
pub fn sample_dataset(index: usize) -> Result<Vec<Product>> {
    let entries = match index {
        0 => CAFE_MENU,
        1 => DEVICES,
        _ => {
            return Err(CatalogError::invalid_argument(format!(
                "no sample dataset {}, expected 0 ({}) or 1 ({})",
                index, SAMPLE_DATASETS[0], SAMPLE_DATASETS[1]
            )))
        }
    };
    Ok(entries.iter().map(SampleEntry::to_product).collect())
}

/// Write a sample dataset to `path` as a JSON array.
pub fn write_sample(path: impl AsRef<Path>, index: usize) -> Result<usize> {
    let path = path.as_ref();
    let products = sample_dataset(index)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&products)?)?;

    info!("Wrote {} sample products to {:?}", products.len(), path);
    Ok(products.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::load_products;
    use std::collections::HashSet;

    #[test]
    fn test_datasets_have_twenty_unique_skus() {
        for index in 0..SAMPLE_DATASETS.len() {
            let products = sample_dataset(index).unwrap();
            assert_eq!(products.len(), 20);

            let skus: HashSet<&str> = products.iter().map(|p| p.sku.as_str()).collect();
            assert_eq!(skus.len(), 20);
            assert!(products.iter().all(|p| p.validate().is_ok()));
        }
    }

    #[test]
    fn test_cafe_menu_availability() {
        let products = sample_dataset(0).unwrap();
        let unavailable: Vec<&str> = products
            .iter()
            .filter(|p| !p.available)
            .map(|p| p.name.as_str())
            .collect();

        assert_eq!(unavailable, vec!["Americano", "Croque Monsieur"]);
    }

    #[test]
    fn test_unknown_dataset() {
        let err = sample_dataset(2).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_written_sample_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples").join("devices.json");

        assert_eq!(write_sample(&path, 1).unwrap(), 20);

        let report = load_products(&path).unwrap();
        assert!(report.rejected.is_empty());
        assert_eq!(report.products, sample_dataset(1).unwrap());
    }
}
