//! Canonical keyword tables and canned replies for message classification.

use chrono::{Timelike, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

pub const GREETING_KEYWORDS: &[&str] = &["hello", "hi", "hey", "good morning", "good evening", "howdy"];
pub const GREETING_REPLIES: &[&str] = &[
    "Hello, I'm TerraBot, your land information assistant. How can I help you with land matters today?",
    "Hi there! How can I assist you with your land-related questions?",
    "Hey! Need help with land or property matters? Just ask!",
    "Waz up! I'm here to provide information about land and property. How can I help?",
    "Wow, you're here! If you have any land-related questions, I'm your assistant!",
    "Howdy! Need assistance with land or property? I'm here to help!",
];

pub const APPRECIATION_KEYWORDS: &[&str] = &[
    "thank you",
    "thanks",
    "much appreciated",
    "grateful",
    "thankful",
    "cheers",
];
pub const APPRECIATION_REPLIES: &[&str] = &[
    "You're welcome!",
    "Happy to help!",
    "Anytime!",
    "Glad I could assist you.",
    "You're most welcome!",
    "No problem at all!",
];

pub const CLOSING_KEYWORDS: &[&str] = &["goodbye", "see you later", "bye", "cyl"];
pub const CLOSING_REPLIES: &[&str] = &[
    "Goodbye! Have a great day!",
    "See you later! Reach out if you need land help.",
    "Take care! Let me know if you have more land-related questions.",
    "Bye! I'm here whenever you need land info.",
    "Farewell! Happy to assist anytime.",
];

pub const CORRECTION_KEYWORDS: &[&str] = &[
    "wrong",
    "incorrect",
    "mistake",
    "not right",
    "error",
    "that's wrong",
    "that's not correct",
];
pub const CORRECTION_REPLIES: &[&str] = &[
    "I apologize for the mistake. Let me correct that for you.",
    "Sorry about that! Let me try again.",
    "My apologies for the error! How can I help you further?",
    "Oops! I made a mistake. Please allow me to fix it.",
    "Sorry for the confusion! I'll do my best to correct it.",
    "I’m sorry, I didn’t get that right. Let me assist you properly.",
];

pub const OFF_TOPIC_REJECTION: &str =
    "Sorry, this question is not related to land or property. I can only help with land-related queries.";
pub const OFF_TOPIC_REDIRECTS: &[&str] = &[
    "I'm TerraBot, and I can only help with land and property questions. Try asking about land titles, surveys, or zoning.",
    "That's outside what I know. Ask me about land ownership, deeds, or property taxes instead!",
    "I focus on land-related matters. Do you have a question about a lot, a title, or a land transfer?",
];

const BISAYA_PREFIXES: &[&str] = &["maayong", "mayng", "mayong"];

/// Cebuano greeting families, in matching order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BisayaGreeting {
    Buntag,
    Hapon,
    Gabii,
    Kumusta,
    Oi,
}

impl BisayaGreeting {
    const ALL: [BisayaGreeting; 5] = [
        BisayaGreeting::Buntag,
        BisayaGreeting::Hapon,
        BisayaGreeting::Gabii,
        BisayaGreeting::Kumusta,
        BisayaGreeting::Oi,
    ];

    fn word(self) -> &'static str {
        match self {
            BisayaGreeting::Buntag => "buntag",
            BisayaGreeting::Hapon => "hapon",
            BisayaGreeting::Gabii => "gabii",
            BisayaGreeting::Kumusta => "kumusta",
            BisayaGreeting::Oi => "oi",
        }
    }

    /// Time-of-day greetings need a `maayong` prefix; the others stand alone.
    fn needs_prefix(self) -> bool {
        matches!(
            self,
            BisayaGreeting::Buntag | BisayaGreeting::Hapon | BisayaGreeting::Gabii
        )
    }

    pub fn replies(self) -> &'static [&'static str] {
        match self {
            BisayaGreeting::Buntag => &[
                "Maayong buntag kanimo!",
                "Buntag! Hinaot nga maayo ang imong sinugdanan sa adlaw.",
                "Maayong buntag! Andam na ba ka sa imong mga pangutana bahin sa yuta karon?",
                "Pagkanindot sa buntag! Unsa may akong ikatabang kanimo?",
            ],
            BisayaGreeting::Hapon => &[
                "Maayong hapon kanimo!",
                "Hapon na! Nanghinaut ko nga maayo ang imong pagpadayon sa adlaw.",
                "Maayong hapon! Naa ka bay mga pangutana nga akong matubag karon?",
                "Maayong hapon! Unsa may imong gihunahuna bahin sa yuta karong hapona?",
            ],
            BisayaGreeting::Gabii => &[
                "Maayong gabii kanimo!",
                "Gabii na! Hinaot nga nakapahulay ka og maayo karong adlawa.",
                "Maayong gabii! Andam na ba ka mohunong sa imong mga buluhaton o naa pa kay pangutana?",
                "Maayong gabii! Manghinaut ko nga maayo ang imong pagkatulog unya.",
            ],
            BisayaGreeting::Kumusta => &[
                "Kumusta man ka?",
                "Okay ra ko, salamat sa pagpangutana!",
                "Kumusta! Unsa may imong tuyo karon?",
                "Maayong adlaw/hapon/gabii! Kumusta ka?",
            ],
            BisayaGreeting::Oi => &["Oi!", "Hoy! Unsa man?", "Oi! Naa kay ipangutana?", "Kumusta!"],
        }
    }
}

pub const LAND_KEYWORDS_EN: &[&str] = &[
    "land", "surveyor", "processor", "survey", "teritory", "boundary", "ownership", "property",
    "real estate", "acessor", "deed of sale", "title deed", "zoning", "processing", "parcel", "lot",
    "terrain", "geodetic", "land title transfer", "topography", "coordinates", "gis", "easement",
    "tenure", "leasehold", "freehold", "subdivision", "appraisal", "mortgage", "escrow", "cadastral",
    "geospatial", "dispute", "land use", "notary", "affidavit", "forestry", "conservation",
    "survey marker", "land grant", "land registry", "demarcation", "surveying instruments",
    "mapping", "cartography", "site development", "land reclamation", "environmental impact",
    "hydrography", "title insurance", "heritage land", "right of way", "geological survey",
    "land tenure system", "land valuation", "site planning", "land tenure security",
    "property assessment", "legal description", "land act", "urban planning", "rural land",
    "municipal planning", "land ownership transfer", "taxation of land", "land development",
    "land acquisition", "land leasing", "survey regulations",
    "electronic certificate authorizing registration", "deed of donation", "deed of adjudication",
    "real property tax", "capital gains tax", "documentary stamp tax", "transfer tax", "estate tax",
    "special assessment tax", "zonal valuation", "title", "tax", "blueprint", "permit", "claim",
    "reform", "condominium", "townhouse", "commercial", "agricultural", "industrial", "residential",
    "management", "administration", "policy", "law", "information system", "rights",
    "transactions", "agreement", "payment", "verification", "investigation", "settlement",
    "mediation", "arbitration", "litigation", "settlers", "housing", "price", "market",
    "investment", "buy", "sell", "construction", "mining", "tourism", "environmental protection",
    "preservation", "rehabilitation", "reclassification", "consolidation", "division", "exchange",
    "donation", "inheritance", "distribution", "planning", "ordinance", "code", "regulations",
    "infrastructure", "public access", "private", "public", "heritage", "ancestral domain",
    "indigenous", "governance", "economics", "instruments",
];

pub const LAND_KEYWORDS_CEB: &[&str] = &[
    "yuta", "sukod", "utlanan", "propyedad", "titulo", "parsela", "lote", "tereyn", "topograpiya",
    "subdibisyon", "kadastral", "panagbangi", "gamit sa yuta", "notaryo", "lasang", "konserbasyon",
    "pagpalambo sa yuta", "pag-angkon sa yuta", "pag-abang sa yuta", "buhis", "plano", "permiso",
    "reporma", "komersyal", "agrikultural", "industriyal", "residensyal", "pagdumala",
    "administrasyon", "polisya", "balaod", "sistema sa impormasyon", "katungod", "transaksyon",
    "kasabutan", "pagbayad", "beripikasyon", "imbestigasyon", "areglo", "mediasyon", "arbitrasyon",
    "litigasyon", "settler", "pabahay", "presyo", "merkado", "puhunan", "palit", "baligya",
    "konstruksyon", "mina", "turismo", "proteksyon sa kinaiyahan", "preserbasyon",
    "rehabilitasyon", "reklasipikasyon", "konsolidasyon", "dibisyon", "ilis", "donasyon", "kabilin",
    "apod-apod", "pagplano", "ordinansa", "kodigo", "regulasyon", "imprastraktura",
    "publikong access", "pribado", "publiko", "lumad", "ekonomiya", "instrumento",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    BisayaGreeting(BisayaGreeting),
    Appreciation,
    Closing,
    Correction,
    LandQuery,
    OffTopic,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\''
}

fn starts_with_word(hay: &str, kw: &str) -> bool {
    hay.strip_prefix(kw)
        .is_some_and(|rest| !rest.chars().next().is_some_and(is_word_char))
}

fn contains_word(hay: &str, kw: &str) -> bool {
    hay.match_indices(kw).any(|(i, _)| {
        let before_ok = !hay[..i].chars().next_back().is_some_and(is_word_char);
        let after_ok = !hay[i + kw.len()..].chars().next().is_some_and(is_word_char);
        before_ok && after_ok
    })
}

fn bisaya_greeting(lowered: &str) -> Option<BisayaGreeting> {
    BisayaGreeting::ALL.into_iter().find(|g| {
        if g.needs_prefix() {
            BISAYA_PREFIXES
                .iter()
                .any(|p| starts_with_word(lowered, &format!("{p} {}", g.word())))
        } else {
            starts_with_word(lowered, g.word())
        }
    })
}

pub fn is_land_related(message: &str) -> bool {
    let lowered = message.to_lowercase();
    LAND_KEYWORDS_EN
        .iter()
        .chain(LAND_KEYWORDS_CEB)
        .any(|kw| lowered.contains(kw))
}

/// Classify a trimmed user message. Conversational intents are checked before land relevance.
pub fn classify(message: &str) -> Intent {
    let lowered = message.trim().to_lowercase();
    if GREETING_KEYWORDS.iter().any(|k| starts_with_word(&lowered, k)) {
        return Intent::Greeting;
    }
    if let Some(g) = bisaya_greeting(&lowered) {
        return Intent::BisayaGreeting(g);
    }
    if APPRECIATION_KEYWORDS.iter().any(|k| contains_word(&lowered, k)) {
        return Intent::Appreciation;
    }
    if CLOSING_KEYWORDS.iter().any(|k| contains_word(&lowered, k)) {
        return Intent::Closing;
    }
    if CORRECTION_KEYWORDS.iter().any(|k| contains_word(&lowered, k)) {
        return Intent::Correction;
    }
    if is_land_related(&lowered) {
        Intent::LandQuery
    } else {
        Intent::OffTopic
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, table: &[&'static str]) -> String {
    table.choose(rng).copied().unwrap_or_default().to_string()
}

/// Fixed reply for conversational intents; `None` for intents that need retrieval.
pub fn canned_reply<R: Rng + ?Sized>(intent: Intent, rng: &mut R) -> Option<String> {
    match intent {
        Intent::Greeting => Some(pick(rng, GREETING_REPLIES)),
        Intent::BisayaGreeting(g) => Some(pick(rng, g.replies())),
        Intent::Appreciation => Some(pick(rng, APPRECIATION_REPLIES)),
        Intent::Closing => Some(pick(rng, CLOSING_REPLIES)),
        Intent::Correction => Some(pick(rng, CORRECTION_REPLIES)),
        Intent::LandQuery | Intent::OffTopic => None,
    }
}

pub fn redirect_reply<R: Rng + ?Sized>(rng: &mut R) -> String {
    pick(rng, OFF_TOPIC_REDIRECTS)
}

/// Current hour of day in Asia/Manila (UTC+8, no DST).
pub fn manila_hour() -> u32 {
    (Utc::now().hour() + 8) % 24
}

/// Time-of-day greeting in English or Cebuano.
pub fn timed_greeting<R: Rng + ?Sized>(hour: u32, rng: &mut R) -> String {
    let options: [&str; 2] = match hour {
        5..=11 => ["Maayong buntag!", "Good morning!"],
        12..=17 => ["Maayong hapon!", "Good afternoon!"],
        _ => ["Maayong gabii!", "Good evening!"],
    };
    format!(
        "{} How can I help you with land matters today?",
        pick(rng, &options)
    )
}
