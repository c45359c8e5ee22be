//! Typed view of a DC-NDL RDF bibliographic record.
//!
//! Only the parts the mapper indexes are read. Prefixes are ignored, so
//! `dcterms:title` and `dc:title` are both `title`; where both forms occur
//! the structured one (with an `rdf:Description`) wins.

use crate::xml::XmlElement;

/// A value with its optional reading (transcription).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcribed {
    pub value: String,
    pub transcription: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Agent {
    pub name: String,
    pub transcription: Option<String>,
    /// Authority URI (`rdf:about`) when the agent is linked.
    pub identifier: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    pub value: Option<String>,
    pub transcription: Option<String>,
    /// Subject heading or classification URI.
    pub resource: Option<String>,
}

/// Literal with an optional `rdf:datatype` URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedLiteral {
    pub value: String,
    pub datatype: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartInformation {
    pub title: Option<String>,
    pub creator: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BibliographicRecord {
    /// `rdf:about` of `BibAdminResource`, the record's stable URI.
    pub admin_about: Option<String>,
    pub cataloging_status: Option<String>,
    /// `rdf:about` of `BibResource`.
    pub about: Option<String>,

    pub identifiers: Vec<TypedLiteral>,
    pub title: Option<Transcribed>,
    pub alternative: Option<Transcribed>,
    pub volume: Option<Transcribed>,
    pub series_titles: Vec<Transcribed>,
    pub edition: Option<String>,

    pub creators: Vec<Agent>,
    pub publishers: Vec<Agent>,
    pub publication_place: Option<String>,

    pub date: Option<String>,
    pub issued: Option<String>,

    pub subjects: Vec<Subject>,
    pub languages: Vec<String>,
    pub original_language: Option<String>,
    pub extent: Vec<String>,
    /// `materialType` resource URIs.
    pub material_types: Vec<String>,
    pub descriptions: Vec<String>,
    pub part_information: Vec<PartInformation>,
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn transcribed(el: &XmlElement) -> Option<Transcribed> {
    match el.child("Description") {
        Some(desc) => Some(Transcribed {
            value: desc.child_text("value")?,
            transcription: desc.child_text("transcription"),
        }),
        None => non_empty(&el.text).map(|value| Transcribed {
            value,
            transcription: None,
        }),
    }
}

/// First structured occurrence of `name`, else the first literal one.
fn best_transcribed(res: &XmlElement, name: &str) -> Option<Transcribed> {
    let mut literal = None;
    for el in res.children_named(name) {
        if el.child("Description").is_some() {
            if let Some(t) = transcribed(el) {
                return Some(t);
            }
        } else if literal.is_none() {
            literal = transcribed(el);
        }
    }
    literal
}

fn agent(el: &XmlElement) -> Option<Agent> {
    match el.child("Agent") {
        Some(a) => Some(Agent {
            name: a.child_text("name")?,
            transcription: a.child_text("transcription"),
            identifier: a.attr("about").and_then(non_empty),
            location: a.child_text("location"),
        }),
        None => non_empty(&el.text).map(|name| Agent {
            name,
            ..Default::default()
        }),
    }
}

fn subject(el: &XmlElement) -> Option<Subject> {
    let s = match el.child("Description") {
        Some(desc) => Subject {
            value: desc.child_text("value"),
            transcription: desc.child_text("transcription"),
            resource: desc.attr("about").and_then(non_empty),
        },
        None => Subject {
            value: non_empty(&el.text),
            transcription: None,
            resource: el.attr("resource").and_then(non_empty),
        },
    };
    (s.value.is_some() || s.resource.is_some()).then_some(s)
}

fn texts(res: &XmlElement, name: &str) -> Vec<String> {
    res.children_named(name)
        .filter_map(|e| non_empty(&e.text))
        .collect()
}

impl BibliographicRecord {
    /// Reads a record from its `rdf:RDF` element.
    pub fn from_rdf(rdf: &XmlElement) -> Self {
        let mut rec = BibliographicRecord::default();

        if let Some(admin) = rdf.child("BibAdminResource") {
            rec.admin_about = admin.attr("about").and_then(non_empty);
            rec.cataloging_status = admin.child_text("catalogingStatus");
        }

        let Some(res) = rdf.child("BibResource") else {
            return rec;
        };
        rec.about = res.attr("about").and_then(non_empty);

        rec.identifiers = res
            .children_named("identifier")
            .filter_map(|e| {
                non_empty(&e.text).map(|value| TypedLiteral {
                    value,
                    datatype: e.attr("datatype").and_then(non_empty),
                })
            })
            .collect();

        rec.title = best_transcribed(res, "title");
        rec.alternative = best_transcribed(res, "alternative");
        rec.volume = best_transcribed(res, "volume");
        rec.series_titles = res
            .children_named("seriesTitle")
            .filter_map(transcribed)
            .collect();
        rec.edition = res.child_text("edition");

        rec.creators = res.children_named("creator").filter_map(agent).collect();
        rec.publishers = res.children_named("publisher").filter_map(agent).collect();
        rec.publication_place = res.child_text("publicationPlace");

        rec.date = res.child_text("date");
        rec.issued = res.child_text("issued");

        rec.subjects = res.children_named("subject").filter_map(subject).collect();
        rec.languages = texts(res, "language");
        rec.original_language = res.child_text("originalLanguage");
        rec.extent = texts(res, "extent");
        rec.material_types = res
            .children_named("materialType")
            .filter_map(|e| e.attr("resource").and_then(non_empty))
            .collect();
        rec.descriptions = texts(res, "description");
        rec.part_information = res
            .children_named("partInformation")
            .filter_map(|p| p.child("Description"))
            .map(|d| PartInformation {
                title: d.child_text("title"),
                creator: d.child_text("creator"),
            })
            .filter(|p| p.title.is_some() || p.creator.is_some())
            .collect();

        rec
    }

    /// Finds the `RDF` element anywhere under `root` and reads it.
    pub fn find_in(root: &XmlElement) -> Option<Self> {
        root.find("RDF").map(Self::from_rdf)
    }
}
