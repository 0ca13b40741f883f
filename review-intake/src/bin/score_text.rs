use review_intake::intake::round2;
use review_intake::sentiment::lexicon::LexiconScorer;
use review_intake::sentiment::Sentiment;

/// Print the embedded scorer's verdict for the text given as arguments.
fn main() {
    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        eprintln!("Usage: score_text <review text>");
        std::process::exit(2);
    }

    let polarity = LexiconScorer::new().polarity(&text);
    println!("Text:      {}", text);
    println!("Polarity:  {:.2} (raw {:?})", round2(polarity), polarity);
    println!("Sentiment: {}", Sentiment::from_polarity(polarity));
}
