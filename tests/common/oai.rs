//! OAI-PMH response bodies

/// One record in a ListRecords page.
pub enum OaiRecord {
    Active {
        id: String,
        title: String,
        creators: Vec<String>,
        sets: Vec<String>,
    },
    Deleted {
        id: String,
    },
}

impl OaiRecord {
    pub fn active(id: &str, title: &str, creators: &[&str], sets: &[&str]) -> Self {
        Self::Active {
            id: id.to_string(),
            title: title.to_string(),
            creators: creators.iter().map(|c| c.to_string()).collect(),
            sets: sets.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn deleted(id: &str) -> Self {
        Self::Deleted { id: id.to_string() }
    }

    fn to_xml(&self) -> String {
        match self {
            Self::Active {
                id,
                title,
                creators,
                sets,
            } => {
                let set_specs: String = sets.iter().map(|s| format!("<setSpec>{}</setSpec>", s)).collect();
                let creators: String = creators
                    .iter()
                    .map(|c| format!("<dc:creator>{}</dc:creator>", c))
                    .collect();
                format!(
                    "<record><header><identifier>oai:arXiv.org:{id}</identifier>\
                     <datestamp>2024-03-01</datestamp>{set_specs}</header><metadata>\
                     <oai_dc:dc xmlns:oai_dc=\"http://www.openarchives.org/OAI/2.0/oai_dc/\" \
                     xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\
                     <dc:title>{title}</dc:title>{creators}\
                     <dc:description>About {title}</dc:description>\
                     </oai_dc:dc></metadata></record>"
                )
            }
            Self::Deleted { id } => format!(
                "<record><header status=\"deleted\"><identifier>oai:arXiv.org:{id}</identifier>\
                 <datestamp>2024-03-01</datestamp></header></record>"
            ),
        }
    }
}

fn envelope(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <OAI-PMH xmlns=\"http://www.openarchives.org/OAI/2.0/\">\
         <responseDate>2024-03-02T00:00:00Z</responseDate>{}</OAI-PMH>",
        body
    )
}

/// A ListRecords page, with a resumption token when more pages follow.
pub fn list_records_page(records: &[OaiRecord], token: Option<&str>) -> String {
    let records: String = records.iter().map(OaiRecord::to_xml).collect();
    let token = token
        .map(|t| format!("<resumptionToken cursor=\"0\">{}</resumptionToken>", t))
        .unwrap_or_default();
    envelope(&format!("<ListRecords>{}{}</ListRecords>", records, token))
}

pub fn no_records_match() -> String {
    envelope("<error code=\"noRecordsMatch\">No records match the request</error>")
}
